use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Clone, Debug, Parser)]
#[command(name = "depot", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    /// Configuration file; `DEPOT_*` environment variables override it.
    #[arg(short, long, global = true, default_value = "depot.toml")]
    pub config: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "r", name = "resolve", about = "Resolve request paths, proxying what is missing")]
    Resolve(ResolveArg),
    #[command(alias = "m", name = "metadata", about = "Refresh repository metadata from every remote")]
    Metadata(MetadataArg),
    #[command(name = "check", about = "Validate the configuration and list repositories")]
    Check,
}

#[derive(Clone, Debug, Args)]
pub struct ResolveArg {
    /// Managed repository id.
    pub repository: String,
    /// Paths relative to the repository root.
    #[arg(required = true)]
    pub paths:      Vec<String>,
}

#[derive(Clone, Debug, Args)]
pub struct MetadataArg {
    pub repository: String,
    pub group:      String,
    pub name:       String,
    /// Version-level metadata instead of project-level.
    #[arg(long)]
    pub version:    Option<String>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_app_is_well_formed() { App::command().debug_assert(); }

    #[test]
    fn test_parse_resolve() {
        let app = App::parse_from(["depot", "-c", "x.toml", "resolve", "internal", "a/b/1/b-1.jar", "a/b/1/b-1.pom"]);
        assert_eq!(app.config, PathBuf::from("x.toml"));
        let Commands::Resolve(arg) = app.cmd else {
            panic!("expected resolve");
        };
        assert_eq!(arg.repository, "internal");
        assert_eq!(arg.paths.len(), 2);
    }

    #[test]
    fn test_parse_metadata() {
        let app = App::parse_from(["depot", "metadata", "internal", "org.example", "lib", "--version", "1.0"]);
        let Commands::Metadata(arg) = app.cmd else {
            panic!("expected metadata");
        };
        assert_eq!(arg.version.as_deref(), Some("1.0"));
        assert!(!app.verbose);
    }
}
