use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use bi_dashboard_core::models::chart::{ChartKind, ChartVisibility};
use bi_dashboard_core::models::filter::FilterState;
use bi_dashboard_core::models::report::ReportFormat;
use bi_dashboard_core::Dashboard;

use crate::{BookmarkAction, FilterArgs};

pub async fn login(
    dashboard: &mut Dashboard,
    username: Option<String>,
    password: Option<String>,
    oauth: Option<String>,
) -> anyhow::Result<()> {
    let identity = match (oauth, username) {
        (Some(credential), _) => dashboard.login_with_oauth(&credential).await?,
        (None, Some(username)) => {
            let password = password.context("--password (or BI_DASHBOARD_PASSWORD) is required")?;
            dashboard.login(&username, &password).await?
        }
        (None, None) => bail!("give a username or --oauth <credential>"),
    };
    println!("Logged in as {}", identity.name);
    Ok(())
}

pub fn whoami(dashboard: &Dashboard) {
    let identity = dashboard.identity();
    match (&identity.email, dashboard.is_logged_in()) {
        (_, false) => println!("Not logged in"),
        (Some(email), true) => println!("{} <{email}>", identity.name),
        (None, true) => println!("{}", identity.name),
    }
}

/// Apply the bookmark first, then explicit overrides. Explicit values must
/// name an entry of the product/store selectors.
async fn apply_filter(dashboard: &mut Dashboard, args: &FilterArgs) -> anyhow::Result<()> {
    if let Some(name) = &args.bookmark {
        dashboard.apply_bookmark(name)?;
    }
    if args.product.is_none() && args.store.is_none() {
        return Ok(());
    }
    dashboard.load_catalog().await?;
    if let Some(product) = &args.product {
        dashboard.set_product_filter(product);
    }
    if let Some(store) = &args.store {
        dashboard.set_store_filter(store);
    }
    dashboard
        .check_filter(dashboard.filter())
        .context("see `bi-dashboard catalog` for valid values")?;
    Ok(())
}

/// Print the product and store selector entries.
pub async fn catalog(dashboard: &mut Dashboard) -> anyhow::Result<()> {
    dashboard.load_catalog().await?;
    println!("Products:");
    for p in dashboard.products() {
        println!("  {:<24} (id {})", p.filter_value(), p.product_id);
    }
    println!("Stores:");
    for s in dashboard.stores() {
        println!("  {:<24} (id {})", s.filter_value(), s.store_id);
    }
    Ok(())
}

async fn fetch(dashboard: &mut Dashboard, args: &FilterArgs) -> anyhow::Result<()> {
    let report = dashboard.refresh_data().await?;
    if report.rejected > 0 {
        eprintln!("warning: {} malformed records were skipped", report.rejected);
    }
    apply_filter(dashboard, args).await
}

fn write_svgs(dashboard: &Dashboard, out: &Path) -> anyhow::Result<usize> {
    std::fs::create_dir_all(out).with_context(|| format!("cannot create {}", out.display()))?;
    let mut written = 0;
    for kind in dashboard.visibility().visible() {
        if let Some(svg) = dashboard.svg(kind) {
            let path = out.join(format!("{kind}.svg"));
            std::fs::write(&path, svg).with_context(|| format!("cannot write {}", path.display()))?;
            written += 1;
        }
    }
    Ok(written)
}

pub async fn render(
    dashboard: &mut Dashboard,
    out: &Path,
    filter: &FilterArgs,
    drill: &[String],
) -> anyhow::Result<()> {
    fetch(dashboard, filter).await?;
    for name in drill {
        dashboard.treemap_drill_down(name)?;
    }
    dashboard.render_charts()?;
    let written = write_svgs(dashboard, out)?;
    println!("Wrote {written} charts to {}", out.display());
    Ok(())
}

pub async fn export(
    dashboard: &mut Dashboard,
    format: ReportFormat,
    output: Option<PathBuf>,
    chart: Option<ChartKind>,
    filter: &FilterArgs,
) -> anyhow::Result<()> {
    fetch(dashboard, filter).await?;
    let bytes = match (format, chart) {
        (ReportFormat::Png, Some(kind)) => dashboard.export_png(kind)?,
        (format, _) => dashboard.export(format)?,
    };
    let path = output.unwrap_or_else(|| PathBuf::from(format!("dashboard.{}", format.extension())));
    std::fs::write(&path, &bytes).with_context(|| format!("cannot write {}", path.display()))?;
    println!("Exported {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

pub async fn summary(dashboard: &mut Dashboard, filter: &FilterArgs) -> anyhow::Result<()> {
    fetch(dashboard, filter).await?;
    let totals = dashboard.totals();
    println!("Records:    {}", totals.records);
    println!("Revenue:    {:.2}", totals.revenue);
    println!("Profit:     {:.2}", totals.profit);
    println!("Units sold: {}", totals.units_sold);
    Ok(())
}

pub fn bookmark(dashboard: &mut Dashboard, action: BookmarkAction) -> anyhow::Result<()> {
    match action {
        BookmarkAction::List => {
            let bookmarks = dashboard.bookmarks();
            if bookmarks.is_empty() {
                println!("No bookmarks");
            }
            for b in bookmarks {
                let product = if b.product.is_empty() { "All Products" } else { b.product.as_str() };
                let store = if b.store.is_empty() { "All Stores" } else { b.store.as_str() };
                let charts: Vec<String> = b.charts.visible().iter().map(ToString::to_string).collect();
                println!("{}: {product} / {store} [{}]", b.name, charts.join(", "));
            }
        }
        BookmarkAction::Save {
            name,
            product,
            store,
            hidden,
        } => {
            let mut visibility = ChartVisibility::all_visible();
            for kind in hidden {
                visibility.set(kind, false);
            }
            dashboard.set_filter(FilterState::new(product, store));
            dashboard.set_visibility(visibility);
            dashboard.save_bookmark(&name)?;
            println!("Saved bookmark '{}'", name.trim());
        }
        BookmarkAction::Rename { from, to } => {
            dashboard.rename_bookmark(&from, &to)?;
            println!("Renamed '{from}' to '{to}'");
        }
        BookmarkAction::Delete { name } => {
            dashboard.delete_bookmark(&name)?;
            println!("Deleted bookmark '{name}'");
        }
    }
    Ok(())
}

pub async fn email(
    dashboard: &mut Dashboard,
    recipient: &str,
    message: &str,
    formats: &[ReportFormat],
    filter: &FilterArgs,
) -> anyhow::Result<()> {
    fetch(dashboard, filter).await?;
    dashboard.email_report(recipient, message, formats).await?;
    println!("Report sent to {recipient}");
    Ok(())
}

/// Poll the API until Ctrl-C. A failed fetch keeps the previous charts.
pub async fn watch(
    dashboard: &mut Dashboard,
    out: &Path,
    interval: Option<u64>,
    filter: &FilterArgs,
) -> anyhow::Result<()> {
    let secs = interval.unwrap_or(dashboard.settings().refresh_interval_secs).max(1);
    let mut ticker = tokio::time::interval(Duration::from_secs(secs));
    apply_filter(dashboard, filter).await?;
    tracing::info!(every_secs = secs, out = %out.display(), "watching");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match dashboard.refresh_data().await {
                    Ok(report) => {
                        let redrawn = dashboard.render_charts()?;
                        if !redrawn.is_empty() {
                            write_svgs(dashboard, out)?;
                        }
                        tracing::info!(
                            accepted = report.accepted,
                            rejected = report.rejected,
                            redrawn = redrawn.len(),
                            "refreshed"
                        );
                    }
                    Err(e) => tracing::warn!(error = %e, "refresh failed, keeping previous data"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("stopping");
                return Ok(());
            }
        }
    }
}
