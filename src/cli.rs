use clap::Parser;

const HELP_TEMPLATE: &str = "\
{before-help}{about-with-newline}

{usage-heading}
  {usage}

{tab}Arguments:
{positionals}

{tab}Options:
{options}

{after-help}
";

#[derive(Parser)]
#[command(name = "gh-audit")]
#[command(about = "Audit a GitHub organization's repositories for baseline security hygiene")]
#[command(
    long_about = "gh-audit takes a one-shot snapshot of a GitHub organization or user\n\
    account and checks every repository for a valid CODEOWNERS file and for\n\
    branch-protection settings on the default branch.\n\n\
    Checks:\n\
    • CODEOWNERS present and non-empty (.github/, root, docs/)\n\
    • Required PR approvals (2 or more)\n\
    • Signed commits, admin enforcement, conversation resolution\n\
    • Force pushes and branch deletions disallowed\n\n\
    Results are written to <target>_audit_report.html in the working directory."
)]
#[command(
    help_template = HELP_TEMPLATE,
    after_help = "Examples:\n\
    \n\
    Audit an organization:\n\
      $ gh-audit my-org\n\
    \n\
    Audit against a GitHub Enterprise instance:\n\
      $ gh-audit my-org --api-url https://github.example.com/api/v3\n\
    \n\
    Check repositories in parallel:\n\
      $ gh-audit my-org -j 8\n\
    \n\
    The GITHUB_TOKEN environment variable must be set before running."
)]
pub struct Cli {
    /// GitHub organization or username to audit
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// GitHub API base URL
    ///
    /// Defaults to the public endpoint (https://api.github.com).
    /// Point this at /api/v3 of a GitHub Enterprise instance to audit it.
    #[arg(long = "api-url", value_name = "URL")]
    pub api_url: Option<String>,

    /// Number of repositories to check in parallel
    ///
    /// Default: 1 (fully sequential). Findings are independent per
    /// repository, so higher values only change wall-clock time.
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// Verbose output
    ///
    /// Prints each repository's findings as they are collected.
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

/// Generate shell completion scripts
pub fn generate_completions(shell: &str, app: &mut clap::Command) {
    use clap_complete::{generate, shells};
    match shell {
        "zsh" => {
            generate(shells::Zsh, app, "gh-audit", &mut std::io::stdout());
        }
        "fish" => {
            generate(shells::Fish, app, "gh-audit", &mut std::io::stdout());
        }
        "bash" => {
            generate(shells::Bash, app, "gh-audit", &mut std::io::stdout());
        }
        "powershell" => {
            generate(shells::PowerShell, app, "gh-audit", &mut std::io::stdout());
        }
        _ => {
            eprintln!("Unsupported shell: {}", shell);
            eprintln!("Supported shells: zsh, fish, bash, powershell");
        }
    }
}
