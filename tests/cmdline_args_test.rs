//! Tests for command-line argument parsing
//!
//! These tests build a parser with the same structure as the binary's and
//! check it accepts and rejects the same invocations.

use clap::{Arg, ArgAction, Command as ClapCommand};

fn create_test_command() -> ClapCommand {
    ClapCommand::new("classroom-monitor")
        .version("0.1.0")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('C')
                .long("config")
                .value_name("PATH")
                .global(true),
        )
        .arg(Arg::new("seed").long("seed").value_name("SEED").global(true))
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            ClapCommand::new("scan")
                .arg(Arg::new("image").required(true))
                .arg(Arg::new("annotate").short('a').long("annotate").value_name("PATH")),
        )
        .subcommand(
            ClapCommand::new("replay")
                .arg(Arg::new("images").required(true).num_args(1..))
                .arg(
                    Arg::new("students")
                        .short('s')
                        .long("students")
                        .default_value("6"),
                )
                .arg(Arg::new("duration").long("duration").default_value("60"))
                .arg(Arg::new("threshold").long("threshold")),
        )
        .subcommand(ClapCommand::new("example-config"))
}

fn value<'a>(matches: &'a clap::ArgMatches, name: &str) -> Option<&'a str> {
    matches.get_one::<String>(name).map(String::as_str)
}

#[test]
fn test_help_argument() {
    let result = create_test_command().try_get_matches_from(vec!["classroom-monitor", "--help"]);
    assert_eq!(result.unwrap_err().kind(), clap::error::ErrorKind::DisplayHelp);
}

#[test]
fn test_subcommand_required() {
    let result = create_test_command().try_get_matches_from(vec!["classroom-monitor"]);
    assert!(result.is_err());
}

#[test]
fn test_scan_arguments() {
    let matches = create_test_command()
        .try_get_matches_from(vec!["classroom-monitor", "scan", "room.png", "-a", "out.png"])
        .unwrap();
    let (name, scan) = matches.subcommand().unwrap();
    assert_eq!(name, "scan");
    assert_eq!(value(scan, "image"), Some("room.png"));
    assert_eq!(value(scan, "annotate"), Some("out.png"));

    let result = create_test_command().try_get_matches_from(vec!["classroom-monitor", "scan"]);
    assert!(result.is_err());
}

#[test]
fn test_replay_defaults() {
    let matches = create_test_command()
        .try_get_matches_from(vec!["classroom-monitor", "replay", "a.png", "b.png", "c.png"])
        .unwrap();
    let replay = matches.subcommand_matches("replay").unwrap();

    let images: Vec<&String> = replay.get_many::<String>("images").unwrap().collect();
    assert_eq!(images.len(), 3);
    assert_eq!(value(replay, "students"), Some("6"));
    assert_eq!(value(replay, "duration"), Some("60"));
    assert_eq!(value(replay, "threshold"), None);
}

#[test]
fn test_global_arguments_after_subcommand() {
    let matches = create_test_command()
        .try_get_matches_from(vec![
            "classroom-monitor",
            "replay",
            "a.png",
            "--threshold",
            "80",
            "--seed",
            "7",
            "-C",
            "classroom.yaml",
            "--debug",
        ])
        .unwrap();
    let replay = matches.subcommand_matches("replay").unwrap();
    assert_eq!(value(replay, "threshold"), Some("80"));
    assert_eq!(value(replay, "seed"), Some("7"));
    assert_eq!(value(replay, "config"), Some("classroom.yaml"));
    assert!(replay.get_flag("debug"));
}

#[test]
fn test_example_config_takes_no_arguments() {
    assert!(create_test_command()
        .try_get_matches_from(vec!["classroom-monitor", "example-config"])
        .is_ok());
    assert!(create_test_command()
        .try_get_matches_from(vec!["classroom-monitor", "example-config", "extra"])
        .is_err());
}
