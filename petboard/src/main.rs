//! Dashboard refresh binary.
//!
//! One run discovers the dashboard blocks on the configured page, resolves
//! the layered configuration, updates the age and season counters and the
//! message board in place, and regenerates the embeddable calendar widget
//! document. Remote failures degrade individual features; the widget is
//! always written.

mod widget;

use std::collections::HashMap;
use std::path::Path;

use notion::{Block, NewBlock, Notion};
use petboard_core::{age, calendar, config, letters, project, scan, settings};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return;
    }
    let output = arg_value(&args, "--output").unwrap_or_else(|| "index.html".to_string());

    if std::env::var("NOTION_TOKEN").is_err() {
        eprintln!("Error: NOTION_TOKEN environment variable not set.");
        eprintln!("Please set it in .env file or with: export NOTION_TOKEN=your_token_here");
        std::process::exit(1);
    }
    let page_id = match std::env::var("NOTION_PAGE_ID") {
        Ok(id) => id,
        Err(_) => {
            eprintln!("Error: NOTION_PAGE_ID environment variable not set.");
            eprintln!("Set it to the id of the dashboard page shared with the integration.");
            std::process::exit(1);
        }
    };

    let client = match Notion::from_env() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    run(&client, &page_id, Path::new(&output)).await;
}

async fn run(client: &Notion, page_id: &str, output: &Path) {
    let today = age::today_at_home();
    let mut issues: Vec<String> = Vec::new();

    // The page's direct children feed both the board locator and the
    // widget-container bootstrap; when the page itself is unreadable those
    // features are skipped rather than run against an empty view of it.
    let page_children = match client.list_all_children(page_id).await {
        Ok(children) => Some(children),
        Err(e) => {
            warn!(error = %e, "dashboard page unreadable");
            issues.push("Dashboard page could not be read".to_string());
            None
        }
    };

    let roles = scan::scan(client, page_id, &scan::default_signatures()).await;

    // A transient failure here must not look like a stale schema, so both
    // the config layer and the later reconcile step are skipped together.
    let settings_id = roles.get(&scan::Role::SettingsToggle).map(String::as_str);
    let (settings_state, settings_layer) = match settings::inspect(client, settings_id).await {
        Ok((state, layer)) => (Some(state), layer),
        Err(e) => {
            warn!(error = %e, "settings block unreadable, skipping layer and reconcile");
            (None, config::PartialConfig::default())
        }
    };

    let resolved = config::resolve([
        config::from_file(Path::new("petboard.json")),
        pet_record_layer(client).await,
        settings_layer,
    ]);
    info!(pet = %resolved.pet_name, birthday = %resolved.birth_date, "configuration resolved");

    if let Some(state) = &settings_state {
        if let Err(e) = settings::reconcile(client, page_id, state, &resolved).await {
            warn!(error = %e, "settings reconcile failed");
        }
    }

    update_counters(client, page_id, &roles, &resolved, today, &mut issues).await;

    if let Some(children) = &page_children {
        ensure_container(client, page_id, children, &resolved.pet_name).await;
        if let Err(e) = update_board(client, page_id, children).await {
            warn!(error = %e, "message board update failed");
        }
    }

    let index = health_index(client, &mut issues).await;
    let view = project::month_view(project::ViewState::at(today), &index, today);
    let banner = (!issues.is_empty()).then(|| issues.join("; "));
    let html = widget::render_document(&resolved.pet_name, &view, &index, today, banner.as_deref());

    match tokio::fs::write(output, html).await {
        Ok(()) => info!(path = %output.display(), "widget document written"),
        Err(e) => error!(path = %output.display(), error = %e, "widget document write failed"),
    }
}

/// Config layer from the first record of the shared pet-info collection.
/// Absent collection, empty collection, and query failure all yield an
/// empty layer.
async fn pet_record_layer(client: &Notion) -> config::PartialConfig {
    let collection = match client.find_collection(config::PET_INFO_MARKER).await {
        Ok(Some(collection)) => collection,
        Ok(None) => {
            info!("no pet info collection shared, skipping layer");
            return config::PartialConfig::default();
        }
        Err(e) => {
            warn!(error = %e, "pet info lookup failed, skipping layer");
            return config::PartialConfig::default();
        }
    };
    match client.query_records(&collection.id).await {
        Ok(records) => records.first().map(config::from_record).unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "pet info query failed, skipping layer");
            config::PartialConfig::default()
        }
    }
}

/// Rewrite the age and season counter blocks, creating them as callouts
/// under the page when the scan found no block carrying the role.
async fn update_counters(
    client: &Notion,
    page_id: &str,
    roles: &HashMap<scan::Role, String>,
    resolved: &config::Config,
    today: chrono::NaiveDate,
    issues: &mut Vec<String>,
) {
    if resolved.birth_date > today {
        warn!(birthday = %resolved.birth_date, "birth date is in the future, counters untouched");
        issues.push("Birth date is in the future; counters not updated".to_string());
        return;
    }
    let age = age::compute_age(resolved.birth_date, today);
    let season = age::compute_season(resolved.birth_date, today);

    write_counter(
        client,
        page_id,
        roles.get(&scan::Role::AgeCounter),
        &format!("Age: {age}"),
        "🐶",
    )
    .await;
    write_counter(
        client,
        page_id,
        roles.get(&scan::Role::SeasonCounter),
        &format!("Season: {season}"),
        "🍂",
    )
    .await;
}

async fn write_counter(
    client: &Notion,
    page_id: &str,
    block_id: Option<&String>,
    text: &str,
    emoji: &str,
) {
    match block_id {
        Some(id) => {
            // Preserve the block's own kind so an externally restyled
            // counter keeps its styling.
            match client.retrieve_block(id).await {
                Ok(block) => {
                    if let Err(e) = client.update_text(id, &block.kind, text).await {
                        warn!(block = %id, error = %e, "counter update failed");
                    }
                }
                Err(e) => warn!(block = %id, error = %e, "counter fetch failed"),
            }
        }
        None => {
            info!(text = %text, "counter block not found, creating callout");
            if let Err(e) = client
                .append_children(page_id, &[NewBlock::callout(text, emoji)])
                .await
            {
                warn!(error = %e, "counter create failed");
            }
        }
    }
}

/// Create the callout the generated widget document gets embedded under,
/// if the page does not already have one.
async fn ensure_container(client: &Notion, page_id: &str, page_children: &[Block], pet_name: &str) {
    let marker = format!("{pet_name}'s Month");
    let present = page_children
        .iter()
        .any(|block| block.kind == "callout" && block.plain_text.contains(&marker));
    if present {
        return;
    }
    info!("calendar container missing, creating");
    if let Err(e) = client
        .append_children(page_id, &[NewBlock::callout(format!("📅 {marker}"), "🗓️")])
        .await
    {
        warn!(error = %e, "calendar container create failed");
    }
}

/// Pick a random letter from the shared collection and write it into the
/// board callout as a color-typeset inline equation.
async fn update_board(
    client: &Notion,
    page_id: &str,
    page_children: &[Block],
) -> Result<(), notion::Error> {
    let Some(collection) = client.find_collection(letters::BOARD_MARKER).await? else {
        info!("no letter collection shared, board untouched");
        return Ok(());
    };
    let records = client.query_records(&collection.id).await?;
    let mut rng = rand::thread_rng();
    let Some(record) = letters::pick(&mut rng, &records) else {
        info!("letter collection empty, board untouched");
        return Ok(());
    };
    let body = client.list_all_children(&record.id).await?;
    let letter = letters::format_letter(&letters::body_lines(record, &body));

    let state = letters::locate_board(page_children);
    let Some(callout_id) = letters::reconcile_board(client, page_id, &state).await? else {
        warn!("board callout id unavailable after reconcile");
        return Ok(());
    };

    let existing = client.list_all_children(&callout_id).await?;
    match existing.first() {
        Some(child) => {
            client
                .update_equation(&child.id, &child.kind, &letter)
                .await
        }
        None => client
            .append_children(&callout_id, &[NewBlock::equation(letter)])
            .await
            .map(|_| ()),
    }
}

/// Aggregate the health-log collection into the calendar index. Any failure
/// yields an empty index plus a banner line for the widget header.
async fn health_index(client: &Notion, issues: &mut Vec<String>) -> calendar::CalendarIndex {
    match client.find_collection(calendar::HEALTH_LOG_MARKER).await {
        Ok(Some(collection)) => match client.query_records(&collection.id).await {
            Ok(records) => calendar::aggregate(&records),
            Err(e) => {
                warn!(error = %e, "health log query failed");
                issues.push("Health log could not be read".to_string());
                calendar::CalendarIndex::new()
            }
        },
        Ok(None) => {
            warn!("health log collection not shared with the integration");
            issues.push("Health Log collection not found".to_string());
            calendar::CalendarIndex::new()
        }
        Err(e) => {
            warn!(error = %e, "health log lookup failed");
            issues.push("Health log could not be read".to_string());
            calendar::CalendarIndex::new()
        }
    }
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn print_help() {
    println!("petboard - refresh the pet dashboard page and calendar widget");
    println!();
    println!("USAGE:");
    println!("    petboard [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --output <PATH>    Where to write the widget document [default: index.html]");
    println!("    -h, --help         Show this help");
    println!();
    println!("ENVIRONMENT:");
    println!("    NOTION_TOKEN       Integration token (required)");
    println!("    NOTION_PAGE_ID     Dashboard page id (required)");
}
