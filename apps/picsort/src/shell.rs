use anyhow::Result;
use client_core::{
    ClientResult, NavigationSnapshot, NoticeLevel, Notification, PicsortClient, ReviewKey,
    SessionSnapshot,
};
use shared::domain::Category;
use tokio::{
    io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::broadcast::{self, error::TryRecvError},
};
use tracing::{debug, warn};

pub const HELP: &str = "\
commands:
  ls                 show the current folder
  cd PATH|NAME       open a folder
  back               previous folder
  crumb N            jump to breadcrumb N (0 is Root)
  root               top-level folders
  mkdir NAME         create a folder here
  refresh            reload the listing
  open               review the images in this folder
  1-4                categorize (1 Normal, 2 Initial Stage, 3 Option3, 4 Skip)
  n | right          next image
  p | left           previous image
  + | -              zoom in / out
  save               save categorizations
  status             show review progress
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Ls,
    Cd(String),
    Back,
    Crumb(usize),
    Root,
    Mkdir(String),
    Refresh,
    Open,
    Key(ReviewKey),
    ZoomIn,
    ZoomOut,
    Save,
    Status,
    Help,
    Quit,
}

/// Parses one input line; blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "ls" => ShellCommand::Ls,
        "cd" if rest.is_empty() => return Err("usage: cd PATH|NAME".into()),
        "cd" => ShellCommand::Cd(rest.to_string()),
        "back" => ShellCommand::Back,
        "crumb" => match rest.parse() {
            Ok(index) => ShellCommand::Crumb(index),
            Err(_) => return Err("usage: crumb N".into()),
        },
        "root" => ShellCommand::Root,
        "mkdir" => ShellCommand::Mkdir(rest.to_string()),
        "refresh" => ShellCommand::Refresh,
        "open" => ShellCommand::Open,
        "+" => ShellCommand::ZoomIn,
        "-" => ShellCommand::ZoomOut,
        "save" => ShellCommand::Save,
        "status" => ShellCommand::Status,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        _ => match ReviewKey::parse(line) {
            Some(key) => ShellCommand::Key(key),
            None => return Err(format!("unknown command `{line}`, try `help`")),
        },
    };
    Ok(Some(command))
}

pub async fn run(client: PicsortClient) -> Result<()> {
    let mut notices = client.subscribe();
    let mut stdout = io::stdout();
    let mut lines = BufReader::new(io::stdin()).lines();

    let _ = client.navigation.open_root().await;
    flush_notices(&mut notices);
    println!("{}", render_listing(&client.navigation.snapshot().await));
    println!("type `help` for commands");

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(usage) => {
                println!("{usage}");
                continue;
            }
        };
        let keep_going = execute(&client, command).await;
        flush_notices(&mut notices);
        if !keep_going {
            break;
        }
    }
    Ok(())
}

/// Runs one command; returns `false` when the loop should end.
async fn execute(client: &PicsortClient, command: ShellCommand) -> bool {
    let nav = &client.navigation;
    let review = &client.review;
    match command {
        ShellCommand::Ls => println!("{}", render_listing(&nav.snapshot().await)),
        ShellCommand::Cd(target) => {
            let snapshot = nav.snapshot().await;
            let path = snapshot
                .visible_directories()
                .iter()
                .find(|dir| dir.name == target)
                .map(|dir| dir.path.clone())
                .unwrap_or(target);
            if settle(nav.descend(&path).await).is_some() {
                println!("{}", render_listing(&nav.snapshot().await));
            }
        }
        ShellCommand::Back => {
            if settle(nav.go_back().await).is_some() {
                println!("{}", render_listing(&nav.snapshot().await));
            }
        }
        ShellCommand::Crumb(index) => {
            let crumb = nav.snapshot().await.breadcrumbs.get(index).cloned();
            match crumb {
                Some(crumb) => {
                    if settle(nav.select_breadcrumb(&crumb.path).await).is_some() {
                        println!("{}", render_listing(&nav.snapshot().await));
                    }
                }
                None => println!("no breadcrumb {index}"),
            }
        }
        ShellCommand::Root => {
            if settle(nav.open_root().await).is_some() {
                println!("{}", render_listing(&nav.snapshot().await));
            }
        }
        ShellCommand::Mkdir(name) => {
            if settle(nav.create_folder(&name).await).is_some() {
                println!("{}", render_listing(&nav.snapshot().await));
            }
        }
        ShellCommand::Refresh => {
            if settle(nav.refresh().await).is_some() {
                println!("{}", render_listing(&nav.snapshot().await));
            }
        }
        ShellCommand::Open => {
            if settle(client.open_current_folder().await).is_some() {
                println!("{}", render_review(&review.snapshot().await));
            }
        }
        ShellCommand::Key(key) => match review.handle_key(key).await {
            Some(result) => {
                if settle(result).is_some() {
                    println!("{}", render_review(&review.snapshot().await));
                }
            }
            None => println!("no category is bound to that key"),
        },
        ShellCommand::ZoomIn => println!("zoom {}%", review.zoom_in().await.percent()),
        ShellCommand::ZoomOut => println!("zoom {}%", review.zoom_out().await.percent()),
        ShellCommand::Save => {
            if let Some(report) = settle(review.commit().await) {
                debug!(reload = ?report.reload, "commit finished");
                println!("{}", render_review(&review.snapshot().await));
            }
        }
        ShellCommand::Status => println!("{}", render_review(&review.snapshot().await)),
        ShellCommand::Help => println!("{HELP}"),
        ShellCommand::Quit => return false,
    }
    true
}

/// Engine failures are already published as notifications.
fn settle<T>(result: ClientResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(%err, "command failed");
            None
        }
    }
}

fn flush_notices(notices: &mut broadcast::Receiver<Notification>) {
    loop {
        match notices.try_recv() {
            Ok(notice) => println!("{}", render_notice(&notice)),
            Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "notifications dropped"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

pub fn render_notice(notice: &Notification) -> String {
    let tag = match notice.level {
        NoticeLevel::Success => "ok",
        NoticeLevel::Info => "info",
        NoticeLevel::Error => "error",
    };
    format!("[{tag}] {}", notice.message)
}

pub fn render_listing(snapshot: &NavigationSnapshot) -> String {
    let crumbs: Vec<String> = snapshot
        .breadcrumbs
        .iter()
        .enumerate()
        .map(|(index, crumb)| format!("{index}:{}", crumb.name))
        .collect();
    let mut out = crumbs.join(" / ");
    let dirs = snapshot.visible_directories();
    if dirs.is_empty() {
        out.push_str("\n  (no folders)");
    }
    for dir in dirs {
        out.push_str(&format!("\n  {}/", dir.name));
    }
    out
}

pub fn render_review(snapshot: &SessionSnapshot) -> String {
    let Some((position, total)) = snapshot.position() else {
        return match &snapshot.source_path {
            Some(path) => format!("no images in {}", display_folder(path)),
            None => "no folder opened, use `open`".to_string(),
        };
    };
    let name = snapshot
        .current_item()
        .map(|item| item.display_name.as_str())
        .unwrap_or_default();
    let category = snapshot
        .current_category()
        .map(Category::label)
        .unwrap_or("uncategorized");
    let mut out = format!(
        "[{position}/{total}] {name} ({category}) {}% done, zoom {}%",
        snapshot.progress_percent(),
        snapshot.zoom.percent()
    );
    if snapshot.is_complete() {
        out.push_str(&format!(
            "\nall {} images categorized, `save` to commit",
            snapshot.categorized_count()
        ));
    }
    out
}

fn display_folder(path: &str) -> &str {
    if path.is_empty() {
        "Root"
    } else {
        path
    }
}

#[cfg(test)]
#[path = "tests/shell_tests.rs"]
mod tests;
