//! Tests for status, stats, history, purge, cancel, platforms, completions, man.

use super::{parse, parse_err};
use crate::cli::CliCommand;

#[test]
fn cli_parse_status() {
    match parse(&["vidq", "status"]) {
        CliCommand::Status { limit } => assert_eq!(limit, 20),
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_parse_status_limit() {
    match parse(&["vidq", "status", "--limit", "5"]) {
        CliCommand::Status { limit } => assert_eq!(limit, 5),
        _ => panic!("expected Status with --limit"),
    }
}

#[test]
fn cli_parse_stats() {
    match parse(&["vidq", "stats"]) {
        CliCommand::Stats => {}
        _ => panic!("expected Stats"),
    }
}

#[test]
fn cli_parse_history() {
    match parse(&["vidq", "history", "https://twitch.tv/videos/1"]) {
        CliCommand::History { url } => assert_eq!(url, "https://twitch.tv/videos/1"),
        _ => panic!("expected History"),
    }
}

#[test]
fn cli_parse_purge_default_and_days() {
    match parse(&["vidq", "purge"]) {
        CliCommand::Purge { days } => assert_eq!(days, 30),
        _ => panic!("expected Purge"),
    }
    match parse(&["vidq", "purge", "--days", "7"]) {
        CliCommand::Purge { days } => assert_eq!(days, 7),
        _ => panic!("expected Purge with --days"),
    }
}

#[test]
fn cli_parse_cancel() {
    match parse(&["vidq", "cancel", "https://vimeo.com/9"]) {
        CliCommand::Cancel { url } => assert_eq!(url, "https://vimeo.com/9"),
        _ => panic!("expected Cancel"),
    }
    assert!(parse_err(&["vidq", "cancel"]));
}

#[test]
fn cli_parse_platforms() {
    match parse(&["vidq", "platforms"]) {
        CliCommand::Platforms => {}
        _ => panic!("expected Platforms"),
    }
}

#[test]
fn cli_parse_completions_and_man() {
    match parse(&["vidq", "completions", "bash"]) {
        CliCommand::Completions { shell } => assert_eq!(shell, clap_complete::Shell::Bash),
        _ => panic!("expected Completions"),
    }
    assert!(parse_err(&["vidq", "completions", "cmd.exe"]));
    match parse(&["vidq", "man"]) {
        CliCommand::Man => {}
        _ => panic!("expected Man"),
    }
}

#[test]
fn cli_definition_is_consistent() {
    use clap::CommandFactory;
    crate::cli::Cli::command().debug_assert();
}
