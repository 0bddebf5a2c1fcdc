use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use colored::Colorize;

use hindsight::cli::{Cli, Commands};
use hindsight::config::settings;
use hindsight::db::models::{SessionOverview, Summary, SummaryKind};
use hindsight::index::store::SearchDb;
use hindsight::llm::summarizer;
use hindsight::paths::codec;
use hindsight::transcript::message;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = settings::load_config()?;
    settings::ensure_hindsight_dir()?;

    let mut db = SearchDb::open(&config.db_path(), config.projects_dir())?;

    match cli.command {
        Commands::Sync => handle_sync(&mut db)?,
        Commands::Search {
            query,
            project,
            limit,
        } => handle_search(&db, &query, project.as_deref(), limit)?,
        Commands::Stats => handle_stats(&db)?,
        Commands::Projects => handle_projects(&mut db)?,
        Commands::Sessions { project } => handle_sessions(&db, &project)?,
        Commands::Summarize { project, session } => {
            handle_summarize(&mut db, &config, &project, session.as_deref()).await?
        }
        Commands::Rename { old, new } => handle_rename(&mut db, &old, &new)?,
    }

    Ok(())
}

fn handle_sync(db: &mut SearchDb) -> Result<()> {
    let report = db.sync()?;
    let stats = db.get_index_stats()?;

    println!();
    println!(
        "  {} {}  {}",
        "◉".cyan(),
        "Sync complete".bold(),
        format!(
            "{} added, {} updated, {} removed",
            report.added, report.updated, report.removed
        )
        .dimmed()
    );
    println!(
        "  {} {} files, {} messages indexed",
        "●".dimmed(),
        stats.file_count,
        stats.message_count
    );
    println!();
    Ok(())
}

fn handle_search(db: &SearchDb, query: &str, project: Option<&str>, limit: usize) -> Result<()> {
    let results = db.search(query, Some(limit), project)?;

    if results.is_empty() {
        println!("\n  {} {}\n", "●".dimmed(), "No matching messages found.".dimmed());
        return Ok(());
    }

    print_header(&format!("Search: \"{}\"", query), results.len(), "results");

    for result in &results {
        println!(
            "\n  {} {}  {}  {}",
            "┌".dimmed(),
            result.project_name.blue(),
            result.session_id[..result.session_id.len().min(8)].cyan(),
            format_timestamp(result.timestamp).dimmed()
        );
        println!(
            "  {} {} {}",
            "└".dimmed(),
            role_icon(&result.user_type),
            render_snippet(&result.snippet)
        );
    }

    println!();
    Ok(())
}

fn handle_stats(db: &SearchDb) -> Result<()> {
    let stats = db.get_index_stats()?;
    println!();
    println!(
        "  {} {}  {}",
        "◉".cyan(),
        "Index".bold(),
        format!("{} files, {} messages", stats.file_count, stats.message_count).dimmed()
    );
    println!();
    Ok(())
}

fn handle_projects(db: &mut SearchDb) -> Result<()> {
    let stats = db.get_project_stats()?;

    if stats.is_empty() {
        println!("\n  {} {}\n", "●".dimmed(), "No projects indexed.".dimmed());
        return Ok(());
    }

    let mut rows: Vec<_> = stats.into_iter().collect();
    rows.sort_by(|a, b| b.1.total_messages.cmp(&a.1.total_messages));

    print_header("Projects", rows.len(), "projects");

    for (encoded, project) in &rows {
        let decoded = db.codec().decode(encoded);
        println!(
            "  {} {:<28} {:>4} sessions {:>7} messages  {}",
            "│".dimmed(),
            codec::project_name(&decoded).blue(),
            project.session_count,
            project.total_messages,
            encoded.dimmed()
        );
    }

    println!();
    Ok(())
}

fn handle_sessions(db: &SearchDb, project: &str) -> Result<()> {
    let sessions = db.get_session_summaries_from_db(project)?;

    if sessions.is_empty() {
        println!("\n  {} {}\n", "●".dimmed(), "No sessions with visible messages.".dimmed());
        return Ok(());
    }

    print_header(project, sessions.len(), "sessions");

    for session in &sessions {
        let preview: String = session.first_message.chars().take(72).collect();
        println!(
            "  {} {}  {:>4} msgs  {}  {}",
            "│".dimmed(),
            session.id[..session.id.len().min(8)].cyan(),
            session.message_count,
            format_timestamp(session.last_activity).dimmed(),
            preview
        );
    }

    println!();
    Ok(())
}

async fn handle_summarize(
    db: &mut SearchDb,
    config: &settings::Config,
    project: &str,
    session: Option<&str>,
) -> Result<()> {
    // Summaries compare against indexed counts, so refresh those first.
    db.sync()?;

    let targets: Vec<SessionOverview> = match session {
        Some(id) => db
            .get_session_summaries_from_db(project)?
            .into_iter()
            .filter(|s| s.id == id)
            .collect(),
        None => db.sessions_needing_summary(project)?,
    };

    if targets.is_empty() {
        println!("\n  {} {}\n", "●".dimmed(), "Nothing to summarize.".dimmed());
        return Ok(());
    }

    print_header("Summarizing", targets.len(), "sessions");

    for target in &targets {
        let messages = db.load_session_messages(project, &target.id);
        let visible_count = messages.iter().filter(|m| message::is_visible(m)).count() as i64;

        print!(
            "  {} Session {} ",
            "│".dimmed(),
            target.id[..target.id.len().min(8)].cyan()
        );

        match summarizer::summarize_session(&config.llm, &messages).await {
            Ok(content) => {
                db.save_summary(Summary {
                    id: None,
                    kind: SummaryKind::Session,
                    target_id: target.id.clone(),
                    project_path: project.to_string(),
                    content: content.clone(),
                    created_at: Utc::now().timestamp_millis(),
                    message_count: visible_count,
                })?;
                println!("{}", "✓".green());
                println!("  {}   {}", "│".dimmed(), content);
            }
            Err(e) => {
                println!("{}", "✗".red());
                println!("  {}   {}", "│".dimmed(), format!("{}", e).red());
            }
        }
    }

    // Roll the refreshed session summaries up into a project overview.
    let session_summaries: Vec<String> = db
        .get_session_summaries(project)?
        .into_iter()
        .map(|s| s.content)
        .collect();

    if !session_summaries.is_empty() {
        let total_messages: i64 = db
            .get_session_summaries_from_db(project)?
            .iter()
            .map(|s| s.message_count)
            .sum();

        match summarizer::summarize_project(&config.llm, &session_summaries).await {
            Ok(content) => {
                db.save_summary(Summary {
                    id: None,
                    kind: SummaryKind::Project,
                    target_id: project.to_string(),
                    project_path: project.to_string(),
                    content: content.clone(),
                    created_at: Utc::now().timestamp_millis(),
                    message_count: total_messages,
                })?;
                println!("  {}", "─".repeat(50).dimmed());
                println!("  {} {}", "◉".cyan(), content);
            }
            Err(e) => {
                println!("  {} {}", "✗".red(), format!("{}", e).red());
            }
        }
    }

    println!();
    Ok(())
}

fn handle_rename(db: &mut SearchDb, old: &str, new: &str) -> Result<()> {
    db.rename_project_in_index(old, new)?;
    println!(
        "\n  {} Renamed {} {} {}\n",
        "◉".cyan(),
        old.dimmed(),
        "→".dimmed(),
        new.blue()
    );
    Ok(())
}

// ─── Rich output helpers ────────────────────────────────────

fn print_header(title: &str, count: usize, noun: &str) {
    println!();
    println!(
        "  {} {}  {}",
        "◉".cyan(),
        title.bold(),
        format!("{} {}", count, noun).dimmed()
    );
    println!("  {}", "─".repeat(60).dimmed());
}

fn role_icon(user_type: &str) -> String {
    match user_type {
        "user" => "›".green().to_string(),
        "assistant" => "‹".magenta().to_string(),
        _ => "·".dimmed().to_string(),
    }
}

fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%b %d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "?".to_string())
}

/// Turn the stored `<mark>` spans into terminal highlighting.
fn render_snippet(snippet: &str) -> String {
    let mut out = String::new();
    let mut rest = snippet;

    while let Some(start) = rest.find("<mark>") {
        out.push_str(&rest[..start]);
        rest = &rest[start + "<mark>".len()..];

        let end = rest.find("</mark>").unwrap_or(rest.len());
        out.push_str(&rest[..end].yellow().bold().to_string());
        rest = rest[end..].strip_prefix("</mark>").unwrap_or("");
    }

    out.push_str(rest);
    out.replace('\n', " ")
}
