//! Subcommand definitions.

use clap::Subcommand;

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a file, then move it into the installed library
    Get {
        /// Source URL (http or https)
        url: String,
        /// Catalog id of the title
        #[arg(long)]
        appid: Option<String>,
        /// Display name of the title (also names its folder)
        #[arg(long)]
        name: Option<String>,
        /// File name to write (defaults to the last URL segment)
        #[arg(long)]
        filename: Option<String>,
        /// Preview image cached next to the provisional manifest
        #[arg(long)]
        image_url: Option<String>,
        /// Maximum parallel range requests
        #[arg(long)]
        concurrency: Option<usize>,
        /// Files at or below this many bytes use a single stream
        #[arg(long = "min-chunk", value_name = "BYTES")]
        min_chunk: Option<u64>,
        /// Retries per segment for transient failures
        #[arg(long, default_value_t = 0)]
        retries: u32,
        /// Leave the file in `installing/` instead of installing it
        #[arg(long)]
        no_install: bool,
    },
    /// Inspect installed titles
    Installed {
        #[command(subcommand)]
        command: InstalledCommand,
    },
    /// Inspect titles that are still downloading
    Installing {
        #[command(subcommand)]
        command: InstallingCommand,
    },
    /// List storage volumes
    Disks,
    /// Show disk space used under a path (defaults to the download root)
    Usage {
        /// Directory or file to measure
        path: Option<String>,
    },
    /// View or change the download root
    Root {
        #[command(subcommand)]
        command: RootCommand,
    },
}

/// `ucd installed ...`
#[derive(Subcommand, Debug)]
pub enum InstalledCommand {
    /// List every installed title
    List {
        /// Print manifests as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the manifest of one title
    Get {
        /// Catalog id
        appid: String,
    },
    /// Rebuild `installed-index.json` from the manifests on disk
    Reindex,
}

/// `ucd installing ...`
#[derive(Subcommand, Debug)]
pub enum InstallingCommand {
    /// List provisional manifests
    List {
        /// Print manifests as JSON
        #[arg(long)]
        json: bool,
    },
}

/// `ucd root ...`
#[derive(Subcommand, Debug)]
pub enum RootCommand {
    /// Show the current download root and where it came from
    Get,
    /// Persist a new download root
    Set {
        /// Directory to use (created if missing)
        path: String,
    },
}

#[cfg(test)]
mod tests {
    use crate::parser::Cli;
    use clap::Parser;

    use super::*;

    #[test]
    fn get_with_all_options() {
        let cli = Cli::parse_from([
            "ucd",
            "get",
            "https://cdn.example/Hades.zip",
            "--appid",
            "42",
            "--name",
            "Hades",
            "--concurrency",
            "4",
            "--min-chunk",
            "1048576",
            "--retries",
            "2",
            "--no-install",
        ]);
        let Some(Commands::Get {
            url,
            appid,
            name,
            concurrency,
            min_chunk,
            retries,
            no_install,
            ..
        }) = cli.command
        else {
            panic!("expected get");
        };
        assert_eq!(url, "https://cdn.example/Hades.zip");
        assert_eq!(appid.as_deref(), Some("42"));
        assert_eq!(name.as_deref(), Some("Hades"));
        assert_eq!(concurrency, Some(4));
        assert_eq!(min_chunk, Some(1_048_576));
        assert_eq!(retries, 2);
        assert!(no_install);
    }

    #[test]
    fn get_defaults() {
        let cli = Cli::parse_from(["ucd", "get", "https://cdn.example/a.bin"]);
        let Some(Commands::Get {
            retries,
            no_install,
            filename,
            ..
        }) = cli.command
        else {
            panic!("expected get");
        };
        assert_eq!(retries, 0);
        assert!(!no_install);
        assert!(filename.is_none());
    }

    #[test]
    fn nested_subcommands() {
        let cli = Cli::parse_from(["ucd", "installed", "get", "42"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Installed {
                command: InstalledCommand::Get { ref appid }
            }) if appid == "42"
        ));

        let cli = Cli::parse_from(["ucd", "root", "set", "~/Games"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Root {
                command: RootCommand::Set { ref path }
            }) if path == "~/Games"
        ));

        let cli = Cli::parse_from(["ucd", "installing", "list", "--json"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Installing {
                command: InstallingCommand::List { json: true }
            })
        ));
    }

    #[test]
    fn get_requires_url() {
        assert!(Cli::try_parse_from(["ucd", "get"]).is_err());
    }
}
