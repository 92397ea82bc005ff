use super::*;

#[test]
fn parses_sync_with_all_flags() {
    let cli = Cli::try_parse_from([
        "pickupdb-cli",
        "sync",
        "--force",
        "--product-code",
        "PBNE01",
        "--dry-run",
        "--yes",
    ])
    .expect("expected valid cli args");

    match cli.command {
        Commands::Sync {
            force,
            product_code,
            dry_run,
            yes,
        } => {
            assert!(force);
            assert_eq!(product_code.as_deref(), Some("PBNE01"));
            assert!(dry_run);
            assert!(yes);
        }
        other => panic!("expected sync, got: {other:?}"),
    }
}

#[test]
fn sync_flags_default_to_off() {
    let cli = Cli::try_parse_from(["pickupdb-cli", "sync"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Sync {
            force: false,
            product_code: None,
            dry_run: false,
            yes: false,
        }
    ));
}

#[test]
fn parses_check_with_a_region() {
    let cli = Cli::try_parse_from(["pickupdb-cli", "check", "--region", "gold coast"])
        .expect("expected valid cli args");

    match cli.command {
        Commands::Check { region } => assert_eq!(region.as_deref(), Some("gold coast")),
        other => panic!("expected check, got: {other:?}"),
    }
}

#[test]
fn parses_cache_clear_with_a_product_code() {
    let cli = Cli::try_parse_from(["pickupdb-cli", "cache", "clear", "--product-code", "PGC02"])
        .expect("expected valid cli args");

    match cli.command {
        Commands::Cache {
            command: cache::CacheCommands::Clear { product_code },
        } => assert_eq!(product_code.as_deref(), Some("PGC02")),
        other => panic!("expected cache clear, got: {other:?}"),
    }
}

#[test]
fn parses_cache_stats() {
    let cli = Cli::try_parse_from(["pickupdb-cli", "cache", "stats"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Cache {
            command: cache::CacheCommands::Stats
        }
    ));
}

#[test]
fn parses_catalog_list() {
    let cli =
        Cli::try_parse_from(["pickupdb-cli", "catalog", "list"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Catalog {
            command: catalog::CatalogCommands::List
        }
    ));
}

#[test]
fn a_subcommand_is_required() {
    let result = Cli::try_parse_from(["pickupdb-cli"]);
    assert!(result.is_err(), "bare invocation should print usage and fail");
}
