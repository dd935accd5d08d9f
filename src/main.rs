//! Proverbs demo shell
//!
//! Drives the view controller against the in-memory backend from line
//! commands on stdin.

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proverbs::{
    render_page, MemoryAuth, MemoryDatabase, MenuButton, Page, Panel, ProverbsConfig, SectionKind,
    UiEvent, User, ViewController,
};

const HELP: &str = "\
commands:
  sign-in [uid] [display name]   sign in through the popup
  sign-out
  refresh                        token refresh for the current user
  recent | mine | top | add      switch panel
  post <proverb> | <translation>
  star <section> <postId>        section: recent, mine, top
  comment <section> <postId> <text>
  show                           print the rendered page
  help
  quit";

/// Proverbs - live proverb-sharing client
#[derive(Parser, Debug, Clone)]
#[command(name = "proverbs")]
#[command(about = "Interactive shell over the proverbs view controller")]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "PROVERBS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Write new posts to the collections the sections read from
    #[arg(long, env = "MIRROR_WRITE_PATHS", default_value = "false")]
    mirror_write_paths: bool,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<ProverbsConfig> {
        let mut config = match &self.config {
            Some(path) => ProverbsConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ProverbsConfig::default(),
        };
        if self.mirror_write_paths {
            config.collections.mirror_write_paths();
        }
        Ok(config)
    }
}

/// One line of shell input
#[derive(Debug, Clone, PartialEq)]
enum Command {
    SignIn(User),
    SignOut,
    Refresh,
    Ui(Vec<UiEvent>),
    Show,
    Help,
    Quit,
}

fn parse_section(name: &str) -> anyhow::Result<SectionKind> {
    match name {
        "recent" => Ok(SectionKind::Recent),
        "mine" => Ok(SectionKind::MyPosts),
        "top" => Ok(SectionKind::MyTopPosts),
        other => bail!("unknown section '{other}' (recent, mine, top)"),
    }
}

fn parse_command(line: &str) -> anyhow::Result<Command> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match word {
        "sign-in" => {
            let (uid, name) = rest.split_once(' ').unwrap_or((rest, ""));
            let uid = if uid.is_empty() { "demo-user" } else { uid };
            let mut user = User::new(uid).with_email(format!("{uid}@example.com"));
            if !name.trim().is_empty() {
                user = user.with_display_name(name.trim());
            }
            Command::SignIn(user)
        }
        "sign-out" => Command::SignOut,
        "refresh" => Command::Refresh,
        "recent" => Command::Ui(vec![UiEvent::MenuClicked(MenuButton::Recent)]),
        "mine" => Command::Ui(vec![UiEvent::MenuClicked(MenuButton::MyPosts)]),
        "top" => Command::Ui(vec![UiEvent::MenuClicked(MenuButton::MyTopPosts)]),
        "add" => Command::Ui(vec![UiEvent::AddClicked]),
        "post" => {
            let (proverb, translation) = rest
                .split_once('|')
                .ok_or_else(|| anyhow!("usage: post <proverb> | <translation>"))?;
            Command::Ui(vec![
                UiEvent::AddClicked,
                UiEvent::ProverbInput(proverb.trim().to_string()),
                UiEvent::TranslationInput(translation.trim().to_string()),
                UiEvent::SubmitPost,
            ])
        }
        "star" => {
            let mut parts = rest.split_whitespace();
            let (Some(section), Some(post_id)) = (parts.next(), parts.next()) else {
                bail!("usage: star <section> <postId>");
            };
            Command::Ui(vec![UiEvent::StarClicked {
                section: parse_section(section)?,
                post_id: post_id.to_string(),
            }])
        }
        "comment" => {
            let mut parts = rest.splitn(3, ' ');
            let (Some(section), Some(post_id), Some(text)) = (parts.next(), parts.next(), parts.next())
            else {
                bail!("usage: comment <section> <postId> <text>");
            };
            let section = parse_section(section)?;
            Command::Ui(vec![
                UiEvent::CommentInput {
                    section,
                    post_id: post_id.to_string(),
                    text: text.trim().to_string(),
                },
                UiEvent::SubmitComment {
                    section,
                    post_id: post_id.to_string(),
                },
            ])
        }
        "show" => Command::Show,
        "help" | "" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command '{other}', try 'help'"),
    };
    Ok(command)
}

/// Plain-text outline of the visible page
fn summarize(page: &Page) -> String {
    if page.splash_visible {
        return "[splash] signed out".to_string();
    }

    let panel = page.active_panel();
    let mut out = format!("[{}]", panel.element_id());
    let section = SectionKind::ALL.into_iter().find(|kind| kind.panel() == panel);
    match section {
        Some(kind) => {
            for card in &page.section(kind).cards {
                let star = if card.starred { "*" } else { " " };
                out.push_str(&format!(
                    "\n  {star} {} ({}) {} / {} [{} stars, {} comments]",
                    card.post_id,
                    card.username,
                    card.title,
                    card.text,
                    card.star_count,
                    card.comments.len()
                ));
                for comment in &card.comments {
                    out.push_str(&format!("\n      {}: {}", comment.username, comment.text));
                }
            }
        }
        None if panel == Panel::AddPost => out.push_str("\n  new post form"),
        None => {}
    }
    out
}

async fn execute(
    controller: &mut ViewController,
    auth: &MemoryAuth,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::SignIn(user) => {
            auth.queue_popup_identity(user);
            controller.handle_ui_event(UiEvent::SignInClicked).await?;
        }
        Command::SignOut => controller.handle_ui_event(UiEvent::SignOutClicked).await?,
        Command::Refresh => auth.refresh_token(),
        Command::Ui(events) => {
            for event in events {
                controller.handle_ui_event(event).await?;
                controller.process_pending().await?;
            }
        }
        Command::Show => println!("{}", render_page(controller.page())),
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    controller.process_pending().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("proverbs={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = args.load_config()?;
    info!(
        write_posts = %config.collections.write_posts,
        read_posts = %config.collections.read_posts,
        recent_limit = config.view.recent_limit,
        "Starting proverbs shell"
    );

    let db = Arc::new(MemoryDatabase::new(&config.backend));
    let auth = Arc::new(MemoryAuth::new());
    let mut controller = ViewController::new(db, auth.clone(), config);
    controller.start().await;
    controller.process_pending().await?;

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("error: {e}");
                continue;
            }
        };
        let quit = command == Command::Quit;

        if let Err(e) = execute(&mut controller, &auth, command).await {
            warn!(error = %e, "Command failed");
            println!("error: {e}");
        }
        if quit {
            break;
        }
        println!("{}", summarize(controller.page()));
    }

    info!("Shell closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_post_splits_on_bar() {
        let command = parse_command("post Haste makes waste | Festina lente").unwrap();
        assert_eq!(
            command,
            Command::Ui(vec![
                UiEvent::AddClicked,
                UiEvent::ProverbInput("Haste makes waste".into()),
                UiEvent::TranslationInput("Festina lente".into()),
                UiEvent::SubmitPost,
            ])
        );
        assert!(parse_command("post no separator").is_err());
    }

    #[test]
    fn test_parse_comment_keeps_spaces_in_text() {
        let command = parse_command("comment top p1 well said indeed").unwrap();
        let Command::Ui(events) = command else {
            panic!("expected ui events");
        };
        assert_eq!(
            events[0],
            UiEvent::CommentInput {
                section: SectionKind::MyTopPosts,
                post_id: "p1".into(),
                text: "well said indeed".into(),
            }
        );
    }

    #[test]
    fn test_parse_sign_in_defaults() {
        let Command::SignIn(user) = parse_command("sign-in").unwrap() else {
            panic!("expected sign-in");
        };
        assert_eq!(user.uid, "demo-user");
        assert_eq!(user.display_name, None);

        let Command::SignIn(user) = parse_command("sign-in ana Ana Lima").unwrap() else {
            panic!("expected sign-in");
        };
        assert_eq!(user.display_name.as_deref(), Some("Ana Lima"));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(parse_command("dance").is_err());
        assert!(parse_command("star sideways p1").is_err());
    }
}
