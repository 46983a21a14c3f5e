use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repopush::commands::{account, push};
use repopush::models::{ChangeKind, DiffOutcome, FileComparison};
use repopush::services::archive_service::extract_zip_file;
use repopush::services::{DiffEngine, RepositoryCatalog, TokenStore};
use repopush::{Config, RepoPushError};

fn cli() -> Command {
    let repo_arg = Arg::new("repo")
        .long("repo")
        .short('r')
        .value_name("OWNER/NAME")
        .required(true)
        .help("Target repository");
    let branch_arg = Arg::new("branch")
        .long("branch")
        .short('b')
        .help("Target branch, defaults to the repository's default branch");
    let archive_arg = Arg::new("archive")
        .required(true)
        .value_name("ZIP")
        .help("Project archive to upload");

    Command::new(clap::crate_name!())
        .about("Push a project archive to a GitHub branch as a single commit")
        .version(clap::crate_version!())
        .subcommand_required(true)
        .arg(
            Arg::new("token")
                .long("token")
                .global(true)
                .help("GitHub token, overrides GITHUB_TOKEN and the keyring"),
        )
        .subcommand(
            Command::new("login")
                .about("Validate a token and store it in the keyring")
                .arg(Arg::new("with-token").value_name("TOKEN").required(true)),
        )
        .subcommand(Command::new("logout").about("Remove the stored token"))
        .subcommand(Command::new("whoami").about("Show the authenticated user"))
        .subcommand(Command::new("repos").about("List accessible repositories"))
        .subcommand(
            Command::new("branches")
                .about("List branches of a repository")
                .arg(repo_arg.clone()),
        )
        .subcommand(
            Command::new("create-repo")
                .about("Create a repository for the authenticated user")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("description").long("description").short('d'))
                .arg(Arg::new("private").long("private").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("diff")
                .about("Compare an archive with a branch")
                .arg(archive_arg.clone())
                .arg(repo_arg.clone())
                .arg(branch_arg.clone()),
        )
        .subcommand(
            Command::new("push")
                .about("Commit the differences between an archive and a branch")
                .arg(archive_arg)
                .arg(repo_arg)
                .arg(branch_arg)
                .arg(Arg::new("message").long("message").short('m'))
                .arg(
                    Arg::new("clear")
                        .long("clear")
                        .action(ArgAction::SetTrue)
                        .help("Replace the branch contents with the archive"),
                )
                .arg(
                    Arg::new("delete-missing")
                        .long("delete-missing")
                        .action(ArgAction::SetTrue)
                        .help("Delete remote files absent from the archive"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue),
                ),
        )
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repopush=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli().get_matches()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<RepoPushError>() {
                Some(e) => eprintln!("error[{}]: {}", e.code(), e),
                None => eprintln!("error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(matches: ArgMatches) -> anyhow::Result<()> {
    let config = Config::load_default()?;
    let store = TokenStore::default();
    let token = matches.get_one::<String>("token").map(String::as_str);

    match matches.subcommand() {
        Some(("login", sub)) => {
            let token = required(sub, "with-token")?;
            let user = account::login(token, &config, &store).await?;
            println!("Logged in as {}", user.login);
        }
        Some(("logout", _)) => {
            store.delete()?;
            println!("Removed stored token");
        }
        Some(("whoami", _)) => {
            let (client, source) = account::connect(token, &config, &store)?;
            let user = account::validate(&client, &config).await?;
            println!("{} (token from {:?})", user.login, source);
            if !user.scopes.is_empty() {
                println!("scopes: {}", user.scopes.join(", "));
            }
        }
        Some(("repos", _)) => {
            let (client, _) = account::connect(token, &config, &store)?;
            let catalog = RepositoryCatalog::new(&client, (&config.retry).into());
            for repo in catalog.list_repositories().await? {
                let visibility = if repo.private { "private" } else { "public" };
                println!("{}\t{}\t{}", repo.full_name, visibility, repo.default_branch);
            }
        }
        Some(("branches", sub)) => {
            let (client, _) = account::connect(token, &config, &store)?;
            let catalog = RepositoryCatalog::new(&client, (&config.retry).into());
            let repository = catalog.find_repository(required(sub, "repo")?).await?;
            for branch in catalog
                .list_branches(repository.owner_login(), &repository.name)
                .await?
            {
                let marker = if branch == repository.default_branch { "*" } else { " " };
                println!("{} {}", marker, branch);
            }
        }
        Some(("create-repo", sub)) => {
            let (client, _) = account::connect(token, &config, &store)?;
            let catalog = RepositoryCatalog::new(&client, (&config.retry).into());
            let repository = catalog
                .create_repository(
                    required(sub, "name")?,
                    sub.get_one::<String>("description").map(String::as_str),
                    sub.get_flag("private"),
                )
                .await?;
            println!("Created {}", repository.html_url);
        }
        Some(("diff", sub)) => {
            let (client, _) = account::connect(token, &config, &store)?;
            let catalog = RepositoryCatalog::new(&client, (&config.retry).into());
            let repository = catalog.find_repository(required(sub, "repo")?).await?;
            let branch = sub
                .get_one::<String>("branch")
                .cloned()
                .unwrap_or_else(|| repository.default_branch.clone());
            let files = load_archive(required(sub, "archive")?)?;

            let outcome = DiffEngine::new(&client)
                .compare_files(&repository, &branch, &files)
                .await;
            print_outcome(&outcome);
        }
        Some(("push", sub)) => {
            let (client, _) = account::connect(token, &config, &store)?;
            let catalog = RepositoryCatalog::new(&client, (&config.retry).into());
            let repository = catalog.find_repository(required(sub, "repo")?).await?;
            let archive = required(sub, "archive")?;
            let files = load_archive(archive)?;

            let options = push::PushOptions {
                branch: sub.get_one::<String>("branch").cloned(),
                message: sub.get_one::<String>("message").cloned(),
                clear_existing: sub.get_flag("clear"),
                delete_missing: sub.get_flag("delete-missing"),
                dry_run: sub.get_flag("dry-run"),
            };
            let on_progress = |percent: u8| eprintln!("[{:>3}%]", percent);
            let report = push::push_files(
                &client,
                &repository,
                &files,
                &archive_label(archive),
                &options,
                Some(&on_progress),
            )
            .await?;

            let writes = report.plan.file_writes().count();
            match &report.commit {
                Some(commit) => {
                    println!(
                        "{} {} ({} written, {} deleted)",
                        if commit.created_branch { "Created" } else { "Updated" },
                        report.branch,
                        writes,
                        report.plan.deletes.len()
                    );
                    println!("{}", commit.commit_url);
                }
                None if options.dry_run => println!(
                    "Would write {} and delete {} on {}",
                    writes,
                    report.plan.deletes.len(),
                    report.branch
                ),
                None => println!(
                    "{} is already up to date: {}",
                    report.branch,
                    repository.branch_url(&report.branch)
                ),
            }
        }
        _ => unreachable!("subcommand_required"),
    }
    Ok(())
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> anyhow::Result<&'a str> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .with_context(|| format!("missing argument <{}>", id))
}

fn load_archive(path: &str) -> anyhow::Result<Vec<repopush::models::FileEntry>> {
    extract_zip_file(Path::new(path)).with_context(|| format!("failed to read archive {}", path))
}

fn archive_label(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn print_outcome(outcome: &DiffOutcome) {
    match outcome {
        DiffOutcome::Diffed(_) => {}
        DiffOutcome::NewBranch(_) => println!("Branch does not exist yet, every file is new"),
        DiffOutcome::Unavailable { cause, .. } => {
            println!("Comparison unavailable ({}), every file is treated as new", cause)
        }
    }
    print_comparison(outcome.comparison());
}

fn print_comparison(comparison: &FileComparison) {
    if comparison.has_no_changes() {
        println!("No changes");
        return;
    }
    for (kind, file) in comparison.entries() {
        let marker = match kind {
            ChangeKind::New => "A",
            ChangeKind::Modified => "M",
            ChangeKind::Unchanged => continue,
            ChangeKind::Deleted => "D",
        };
        println!("{} {}", marker, file.path);
    }
    println!("{}", comparison.summary());
}
