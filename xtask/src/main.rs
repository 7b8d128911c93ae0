use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for gridview")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Run fmt, clippy, tests and doc in order
    Check,
    /// Check formatting
    Fmt,
    /// Lint with warnings denied
    Clippy,
    /// Run all workspace tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Play the scripted grid session headless
    Demo,
}

/// A cargo invocation run as one pipeline step.
struct Step {
    name: &'static str,
    args: &'static [&'static str],
}

const FMT: Step = Step {
    name: "fmt",
    args: &["fmt", "--all", "--", "--check"],
};
const CLIPPY: Step = Step {
    name: "clippy",
    args: &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
};
const TEST: Step = Step {
    name: "test",
    args: &["test", "--workspace"],
};
const DOC: Step = Step {
    name: "doc",
    args: &["doc", "--workspace", "--no-deps"],
};
const DEMO: Step = Step {
    name: "demo",
    args: &["run", "-p", "gridview-cli", "--", "demo", "--fps", "60"],
};

impl Commands {
    fn steps(self) -> &'static [Step] {
        match self {
            Commands::Check => &[FMT, CLIPPY, TEST, DOC],
            Commands::Fmt => &[FMT],
            Commands::Clippy => &[CLIPPY],
            Commands::Test => &[TEST],
            Commands::Doc => &[DOC],
            Commands::Demo => &[DEMO],
        }
    }
}

fn run(step: &Step) -> Result<()> {
    println!("==> cargo {}", step.args.join(" "));
    let status = Command::new("cargo").args(step.args).status()?;
    if !status.success() {
        anyhow::bail!("{} failed ({status})", step.name);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    for step in cli.command.steps() {
        run(step)?;
    }
    Ok(())
}
