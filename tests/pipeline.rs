//! End-to-end pipeline runs that touch the filesystem.

use std::fs;
use std::io::Cursor;

use csvpipe::{
    Command, Pipeline, PipelineConfig, PipelineError, Record, TieBreak, execute_pipeline,
    parse_commands, parse_pipeline_text,
};
use tempfile::TempDir;

const SALES: &str = "\
region,year,rep,amount
eu,2024,ann,10
us,2024,bo,20
eu,2023,cy,30
eu,2024,di,40
us,2023,ed,50
";

fn run(input: &str, commands: &[Command], config: PipelineConfig) -> csvpipe::Result<String> {
    let mut out = Vec::new();
    execute_pipeline(Cursor::new(input.to_string()), &mut out, commands, config)?;
    Ok(String::from_utf8(out).unwrap())
}

fn args(dir: &TempDir, template: &str) -> String {
    format!("{}/{template}", dir.path().display())
}

#[test]
fn test_save_partitions_passes_through_and_writes_files() {
    let dir = TempDir::new().unwrap();
    let template = args(&dir, "%s/%s.csv");
    let commands =
        parse_commands(&["save_partitions", "region,year", template.as_str()]).unwrap();

    let out = run(SALES, &commands, PipelineConfig::new().with_partition_flush_rows(1)).unwrap();
    assert_eq!(out, SALES);

    let eu_2024 = fs::read_to_string(dir.path().join("eu/2024.csv")).unwrap();
    assert_eq!(eu_2024, "region,year,rep,amount\neu,2024,ann,10\neu,2024,di,40\n");
    let us_2023 = fs::read_to_string(dir.path().join("us/2023.csv")).unwrap();
    assert_eq!(us_2023, "region,year,rep,amount\nus,2023,ed,50\n");
    assert!(dir.path().join("eu/2023.csv").exists());
    assert!(dir.path().join("us/2024.csv").exists());
}

#[test]
fn test_partitions_then_downstream_stages() {
    let dir = TempDir::new().unwrap();
    let template = args(&dir, "by-region-%s.csv");
    let commands = parse_commands(&[
        "save_partitions",
        "region",
        template.as_str(),
        "grep",
        "region",
        "us",
        "cut",
        "rep",
    ])
    .unwrap();

    let out = run(SALES, &commands, PipelineConfig::default()).unwrap();
    assert_eq!(out, "rep\nbo\ned\n");
    let eu = fs::read_to_string(dir.path().join("by-region-eu.csv")).unwrap();
    assert_eq!(eu.lines().count(), 4);
}

#[test]
fn test_partition_write_failure_aborts_run() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("blocker"), "not a directory").unwrap();
    let template = args(&dir, "blocker/%s.csv");
    let commands = parse_commands(&["save_partitions", "region", template.as_str()]).unwrap();

    let err = run(SALES, &commands, PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, PipelineError::Io { .. }), "got {err}");
}

#[test]
fn test_join_against_file() {
    let dir = TempDir::new().unwrap();
    let side = dir.path().join("regions.csv");
    fs::write(&side, "code,label\neu,Europe\nus,United States\n").unwrap();
    let side = side.display().to_string();
    let commands = parse_commands(&[
        "join",
        side.as_str(),
        "region,code",
        "cut",
        "rep,label",
    ])
    .unwrap();

    let out = run(SALES, &commands, PipelineConfig::default()).unwrap();
    assert_eq!(
        out,
        "rep,label\nann,Europe\nbo,United States\ncy,Europe\ndi,Europe\ned,United States\n"
    );
}

#[test]
fn test_join_missing_side_table_fails_before_running() {
    let commands = parse_commands(&["join", "/nonexistent/regions.csv", "region,code"]).unwrap();
    let err = Pipeline::from_reader(Cursor::new(SALES), PipelineConfig::default())
        .unwrap()
        .apply_all(&commands)
        .err()
        .unwrap();
    assert!(matches!(err, PipelineError::Io { .. }));
}

#[test]
fn test_grep_and_grepv_partition_the_input() {
    let kept = parse_commands(&["grep", "rep", "d"]).unwrap();
    let dropped = parse_commands(&["grepv", "rep", "d"]).unwrap();
    let collect = |commands: &[Command]| -> Vec<Record> {
        Pipeline::from_reader(Cursor::new(SALES), PipelineConfig::default())
            .unwrap()
            .apply_all(commands)
            .unwrap()
            .collect()
            .unwrap()
    };
    let a = collect(&kept[..]);
    let b = collect(&dropped[..]);
    assert_eq!(a.len() + b.len(), 5);
    assert!(a.iter().all(|r| r.field(2).contains('d')));
    assert!(b.iter().all(|r| !r.field(2).contains('d')));
}

#[test]
fn test_sort_tie_break_modes() {
    let input = "k,v\na,2\nb,1\na,1\n";
    let commands = parse_commands(&["sort", "k"]).unwrap();

    let stable = run(input, &commands, PipelineConfig::default()).unwrap();
    assert_eq!(stable, "k,v\na,2\na,1\nb,1\n");

    let config = PipelineConfig::new().with_sort_tie_break(TieBreak::RemainingColumns);
    let fallback = run(input, &commands, config).unwrap();
    assert_eq!(fallback, "k,v\na,1\na,2\nb,1\n");
}

#[test]
fn test_sortf_places_nan_after_numbers() {
    let mut input = String::from("id,v\n");
    for i in 0..25 {
        let v = if i % 3 == 0 {
            "NaN".to_string()
        } else {
            format!("{}.5", 25 - i)
        };
        input.push_str(&format!("{i},{v}\n"));
    }
    let commands = parse_commands(&["sortf", "v"]).unwrap();
    let out = run(&input, &commands, PipelineConfig::default()).unwrap();

    let ids: Vec<&str> = out
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap())
        .collect();
    let mut expected: Vec<String> = (0..25)
        .rev()
        .filter(|i| i % 3 != 0)
        .map(|i| i.to_string())
        .collect();
    expected.extend((0..25).step_by(3).map(|i| i.to_string()));
    assert_eq!(ids, expected);
}

#[test]
fn test_input_bom_is_skipped() {
    let input = "\u{feff}id,name\n1,alice\n";
    let commands = parse_commands(&["cut", "id"]).unwrap();
    assert_eq!(run(input, &commands, PipelineConfig::default()).unwrap(), "id\n1\n");
}

#[test]
fn test_unknown_column_fails_at_build_time() {
    let commands = parse_commands(&["sorti", "price"]).unwrap();
    let err = run(SALES, &commands, PipelineConfig::default()).unwrap_err();
    assert_eq!(err.to_string(), "column missing from input data: 'price'");
}

#[test]
fn test_pipeline_file_with_command_line_directives() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.pipe");
    fs::write(&path, "# first rep per region\nsort region\n| compact region\n").unwrap();

    let mut commands = parse_pipeline_text(&fs::read_to_string(&path).unwrap()).unwrap();
    commands.extend(parse_commands(&["cut", "region,rep"]).unwrap());

    let out = run(SALES, &commands, PipelineConfig::new().with_queue_depth(0)).unwrap();
    assert_eq!(out, "region,rep\neu,ann\nus,bo\n");
}
