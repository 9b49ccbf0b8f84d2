#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Static HTML dashboard rendering.
//!
//! Turns one [`AnalysisResult`] into a self-contained `dashboard.html`:
//! a Leaflet map of hotspot markers colored by severity, with a sidebar
//! of summary cards, top hotspots, neighborhood volume, category
//! recurrence, and gap analysis. The page needs no server; marker data
//! is embedded as JSON and rendered client-side so type filters work
//! without a round trip.

use std::fmt::Write as _;
use std::path::Path;

use infra_map_analysis_models::{AnalysisResult, HotspotRecord};
use infra_map_report_models::InfrastructureCategory;
use log::info;

/// Baltimore city center, the map's initial view.
const BALT_CENTER: (f64, f64) = (39.2904, -76.6122);

/// Initial map zoom level.
const DEFAULT_ZOOM: u8 = 12;

/// Rows shown in the sidebar hotspot and neighborhood lists.
const SIDEBAR_ROWS: usize = 8;

/// Dashboard rendering/writing failures.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Marker color for a severity score.
#[must_use]
pub fn severity_color(score: f64) -> &'static str {
    if score >= 30.0 {
        "#c0392b"
    } else if score >= 20.0 {
        "#e74c3c"
    } else if score >= 12.0 {
        "#e67e22"
    } else if score >= 6.0 {
        "#f39c12"
    } else {
        "#f1c40f"
    }
}

/// Human label for a severity score, aligned with [`severity_color`].
#[must_use]
pub fn severity_label(score: f64) -> &'static str {
    if score >= 30.0 {
        "Critical"
    } else if score >= 20.0 {
        "High"
    } else if score >= 12.0 {
        "Elevated"
    } else if score >= 6.0 {
        "Moderate"
    } else {
        "Low"
    }
}

/// Marker/chip color per taxonomy category.
#[must_use]
pub const fn category_color(category: InfrastructureCategory) -> &'static str {
    match category {
        InfrastructureCategory::Pothole => "#e74c3c",
        InfrastructureCategory::StreetLight => "#f1c40f",
        InfrastructureCategory::Alley => "#9b59b6",
        InfrastructureCategory::Sidewalk => "#3498db",
        InfrastructureCategory::WaterMain => "#1abc9c",
        InfrastructureCategory::CaveIn | InfrastructureCategory::StreetCurb => "#e67e22",
        InfrastructureCategory::StormDrain => "#2980b9",
        InfrastructureCategory::Other => "#7f8c8d",
    }
}

/// Renders the full dashboard page to a string.
///
/// # Errors
///
/// Returns [`RenderError::Json`] if the embedded marker data cannot be
/// serialized.
pub fn render_dashboard(result: &AnalysisResult) -> Result<String, RenderError> {
    let markers = marker_data(result)?;
    let sidebar = render_sidebar(result);

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Baltimore Infrastructure Dashboard</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
<style>
*{{margin:0;padding:0;box-sizing:border-box;}}
body{{font-family:-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,sans-serif;background:#14181d;color:#e0e0e0;display:flex;height:100vh;overflow:hidden;}}
#map{{flex:1;height:100vh;}}
#sidebar{{width:340px;height:100vh;overflow-y:auto;background:#1a1f26;border-right:1px solid #2a2f36;padding:16px;flex-shrink:0;}}
.sidebar-title{{font-size:18px;font-weight:600;color:#fff;}}
.sidebar-subtitle{{font-size:12px;color:#5a6370;margin-bottom:4px;}}
.sidebar-meta{{font-size:11px;color:#5a6370;margin-bottom:16px;}}
.summary-cards{{display:grid;grid-template-columns:1fr 1fr;gap:8px;margin-bottom:20px;}}
.summary-card{{background:#20262e;border-radius:6px;padding:10px;text-align:center;}}
.card-num{{font-size:22px;font-weight:600;color:#fff;}}
.summary-card.alert .card-num{{color:#e67e22;}}
.summary-card.danger .card-num{{color:#e74c3c;}}
.summary-card.gap .card-num{{color:#3498db;}}
.card-label{{font-size:10px;color:#5a6370;text-transform:uppercase;}}
.section{{margin-bottom:20px;}}
.section-title{{font-size:13px;font-weight:600;color:#fff;margin-bottom:2px;}}
.section-subtitle{{font-size:11px;color:#5a6370;margin-bottom:8px;}}
.hotspot-row{{display:flex;gap:8px;align-items:flex-start;padding:6px 0;border-bottom:1px solid #22272e;cursor:pointer;}}
.hotspot-dot{{width:8px;height:8px;border-radius:50%;margin-top:5px;flex-shrink:0;}}
.hotspot-addr{{font-size:12px;color:#d0d8e0;}}
.hotspot-meta{{font-size:11px;color:#5a6370;}}
.severity-tag{{font-weight:600;}}
.failed-tag{{color:#e74c3c;font-size:10px;}}
.nbhd-row{{display:flex;align-items:center;gap:8px;padding:3px 0;font-size:11px;}}
.nbhd-name{{width:130px;color:#d0d8e0;white-space:nowrap;overflow:hidden;text-overflow:ellipsis;}}
.nbhd-bar-wrap{{flex:1;background:#22272e;border-radius:2px;height:6px;}}
.nbhd-bar{{background:#3498db;height:6px;border-radius:2px;}}
.nbhd-count{{width:36px;text-align:right;color:#5a6370;}}
.cat-row{{margin-bottom:8px;}}
.cat-header{{display:flex;align-items:center;gap:6px;font-size:12px;}}
.cat-dot{{width:8px;height:8px;border-radius:50%;}}
.cat-name{{flex:1;color:#d0d8e0;}}
.cat-pct{{font-weight:600;}}
.cat-bar-wrap{{background:#22272e;border-radius:2px;height:4px;margin:3px 0;}}
.cat-bar{{height:4px;border-radius:2px;}}
.cat-detail{{font-size:10px;color:#5a6370;}}
.gap-row{{padding:5px 0;border-bottom:1px solid #22272e;}}
.gap-name{{font-size:12px;color:#d0d8e0;}}
.gap-meta{{font-size:10px;color:#5a6370;}}
.no-data{{font-size:11px;color:#5a6370;padding:8px 0;}}
.sidebar-footer{{font-size:10px;color:#3a4048;margin-top:16px;}}
.popup-card{{font-size:12px;min-width:220px;color:#1a1a1a;}}
.popup-title{{font-weight:600;font-size:13px;}}
.popup-neighborhood{{color:#888;font-size:11px;margin-bottom:6px;}}
.priority-badge{{background:#e74c3c;color:#fff;font-size:9px;padding:1px 5px;border-radius:3px;font-weight:600;}}
.popup-stats{{display:flex;gap:8px;margin:6px 0;}}
.stat-box{{text-align:center;background:#f5f5f5;border-radius:4px;padding:4px 8px;}}
.stat-num{{font-weight:600;}}
.stat-label{{font-size:9px;color:#888;}}
.failed-fix-warning{{background:#fdecea;color:#c0392b;font-size:11px;padding:4px 6px;border-radius:4px;margin:4px 0;}}
.status-row{{display:flex;justify-content:space-between;font-size:11px;color:#555;}}
</style>
</head>
<body>
{sidebar}
<div id="map"></div>
<script id="hotspot-data" type="application/json">{markers}</script>
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<script>
const map = L.map('map').setView([{lat}, {lng}], {zoom});
L.tileLayer('https://{{s}}.basemaps.cartocdn.com/dark_all/{{z}}/{{x}}/{{y}}{{r}}.png', {{
    attribution: '&copy; OpenStreetMap contributors &copy; CARTO',
    maxZoom: 18,
}}).addTo(map);

const hotspots = JSON.parse(document.getElementById('hotspot-data').textContent);
const layer = L.layerGroup().addTo(map);
hotspots.forEach(h => {{
    const m = L.circleMarker([h.lat, h.lng], {{
        radius: Math.min(5 + h.count, 16),
        fillColor: h.color, color: '#fff', weight: 1, fillOpacity: 0.8
    }});
    m.bindPopup(h.popup, {{ maxWidth: 320 }});
    layer.addLayer(m);
}});

function focusHotspot(lat, lng) {{
    map.setView([lat, lng], 16);
}}
</script>
</body>
</html>"#,
        lat = BALT_CENTER.0,
        lng = BALT_CENTER.1,
        zoom = DEFAULT_ZOOM,
    ))
}

/// Renders the dashboard and writes it to `path`, creating parent
/// directories as needed.
///
/// # Errors
///
/// Returns an error if rendering fails or the file cannot be written.
pub fn write_dashboard(result: &AnalysisResult, path: &Path) -> Result<(), RenderError> {
    let html = render_dashboard(result)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &html)?;
    info!(
        "wrote dashboard with {} hotspots to {}",
        result.hotspots.len(),
        path.display()
    );
    Ok(())
}

/// Compact per-marker records embedded in the page, serialized with
/// `</` escaped so the blob is safe inside a `<script>` element.
fn marker_data(result: &AnalysisResult) -> Result<String, serde_json::Error> {
    let markers: Vec<serde_json::Value> = result
        .hotspots
        .iter()
        .map(|hotspot| {
            serde_json::json!({
                "lat": hotspot.latitude,
                "lng": hotspot.longitude,
                "count": hotspot.report_count,
                "color": severity_color(hotspot.severity_score),
                "popup": render_popup(hotspot),
            })
        })
        .collect();
    Ok(serde_json::to_string(&markers)?.replace("</", "<\\/"))
}

fn render_popup(hotspot: &HotspotRecord) -> String {
    let address = hotspot.address_hint.as_deref().unwrap_or("Location");
    let neighborhood = hotspot.neighborhood.as_deref().unwrap_or("Unknown");
    let priority_badge = if hotspot.high_priority {
        r#" <span class="priority-badge">HIGH PRIORITY</span>"#
    } else {
        ""
    };

    let failed_fix_html = if hotspot.failed_fixes > 0 {
        let plural = if hotspot.failed_fixes == 1 { "" } else { "es" };
        format!(
            r#"<div class="failed-fix-warning">{} possible failed fix{plural} (re-reported within the failed-fix window)</div>"#,
            hotspot.failed_fixes
        )
    } else {
        String::new()
    };

    let mut status_html = String::new();
    for (status, count) in &hotspot.status_breakdown {
        let _ = write!(
            status_html,
            r#"<div class="status-row"><span>{}</span><span>{count}</span></div>"#,
            html_escape(status),
        );
    }

    let resolution_html = hotspot.median_resolution_days.map_or_else(String::new, |days| {
        format!(r#"<div>Median resolution: {days} days</div>"#)
    });

    format!(
        r#"<div class="popup-card">
<div class="popup-title">{address}</div>
<div class="popup-neighborhood">{neighborhood}{priority_badge}</div>
<div>{primary_type}</div>
{failed_fix_html}
<div class="popup-stats">
<div class="stat-box"><div class="stat-num">{count}</div><div class="stat-label">reports</div></div>
<div class="stat-box"><div class="stat-num">{span}</div><div class="stat-label">days active</div></div>
<div class="stat-box"><div class="stat-num">{severity}</div><div class="stat-label">severity</div></div>
</div>
<div>First: {first} &rarr; Last: {last}</div>
{resolution_html}
{status_html}
</div>"#,
        address = html_escape(address),
        neighborhood = html_escape(neighborhood),
        primary_type = html_escape(&hotspot.primary_type),
        count = hotspot.report_count,
        span = hotspot.span_days,
        severity = hotspot.severity_score,
        first = hotspot.first_report.format("%Y-%m-%d"),
        last = hotspot.last_report.format("%Y-%m-%d"),
    )
}

fn render_sidebar(result: &AnalysisResult) -> String {
    let summary = &result.summary;

    let date_range = summary.date_range.map_or_else(String::new, |range| {
        format!(
            "{} &rarr; {}",
            range.start.format("%Y-%m-%d"),
            range.end.format("%Y-%m-%d")
        )
    });

    let mut hotspot_rows = String::new();
    for hotspot in result.hotspots.iter().take(SIDEBAR_ROWS) {
        let color = severity_color(hotspot.severity_score);
        let label = severity_label(hotspot.severity_score);
        let category = InfrastructureCategory::classify(&hotspot.primary_type);
        let address = hotspot.address_hint.as_deref().unwrap_or("Unknown location");
        let neighborhood = hotspot.neighborhood.as_deref().unwrap_or("");
        let failed_html = if hotspot.failed_fixes > 0 {
            let plural = if hotspot.failed_fixes == 1 { "" } else { "es" };
            format!(
                r#" <span class="failed-tag">{} failed fix{plural}</span>"#,
                hotspot.failed_fixes
            )
        } else {
            String::new()
        };
        let _ = write!(
            hotspot_rows,
            r#"<div class="hotspot-row" onclick="focusHotspot({lat}, {lng})">
<div class="hotspot-dot" style="background:{dot}"></div>
<div><div class="hotspot-addr">{address}</div>
<div class="hotspot-meta">{neighborhood} &middot; {count} reports &middot; <span class="severity-tag" style="color:{color}">{label}</span>{failed_html}</div></div>
</div>"#,
            lat = hotspot.latitude,
            lng = hotspot.longitude,
            dot = category_color(category),
            address = html_escape(address),
            neighborhood = html_escape(neighborhood),
            count = hotspot.report_count,
        );
    }
    if hotspot_rows.is_empty() {
        hotspot_rows = r#"<div class="no-data">No chronic hotspots found</div>"#.to_owned();
    }

    let max_reports = result
        .neighborhoods
        .first()
        .map_or(1, |n| n.total_reports.max(1));
    let mut neighborhood_rows = String::new();
    #[allow(clippy::cast_precision_loss)]
    for summary_row in result.neighborhoods.iter().take(SIDEBAR_ROWS) {
        let pct = summary_row.total_reports as f64 / max_reports as f64 * 100.0;
        let trend_html = summary_row.trend_pct.map_or_else(String::new, |trend| {
            let arrow = if trend > 5.0 {
                "&uarr;"
            } else if trend < -5.0 {
                "&darr;"
            } else {
                "&rarr;"
            };
            let color = if trend > 10.0 {
                "#e74c3c"
            } else if trend < -10.0 {
                "#2ecc71"
            } else {
                "#95a5a6"
            };
            format!(
                r#" <span style="color:{color};font-size:10px">{arrow} {:.0}%</span>"#,
                trend.abs()
            )
        });
        let _ = write!(
            neighborhood_rows,
            r#"<div class="nbhd-row">
<div class="nbhd-name">{name}{trend_html}</div>
<div class="nbhd-bar-wrap"><div class="nbhd-bar" style="width:{pct:.0}%"></div></div>
<div class="nbhd-count">{count}</div>
</div>"#,
            name = html_escape(&summary_row.neighborhood),
            count = summary_row.total_reports,
        );
    }
    if neighborhood_rows.is_empty() {
        neighborhood_rows = r#"<div class="no-data">No neighborhood data</div>"#.to_owned();
    }

    let mut cat_rows = String::new();
    for stats in &result.category_stats {
        let pct = stats.recurrence_pct;
        let bar_color = if pct >= 40.0 {
            "#e74c3c"
        } else if pct >= 20.0 {
            "#e67e22"
        } else {
            "#2ecc71"
        };
        let category = stats
            .category
            .parse::<InfrastructureCategory>()
            .unwrap_or(InfrastructureCategory::Other);
        let _ = write!(
            cat_rows,
            r#"<div class="cat-row">
<div class="cat-header"><div class="cat-dot" style="background:{dot}"></div>
<div class="cat-name">{name}</div><div class="cat-pct" style="color:{bar_color}">{pct}%</div></div>
<div class="cat-bar-wrap"><div class="cat-bar" style="width:{width:.0}%;background:{bar_color}"></div></div>
<div class="cat-detail">{total} requests &middot; {rereports} apparent re-reports</div>
</div>"#,
            dot = category_color(category),
            name = html_escape(&stats.category),
            width = pct.min(100.0),
            total = stats.total_requests,
            rereports = stats.rereports,
        );
    }
    if cat_rows.is_empty() {
        cat_rows = r#"<div class="no-data">No category statistics</div>"#.to_owned();
    }

    let mut gap_rows = String::new();
    for gap in result.gaps.iter().take(5) {
        let _ = write!(
            gap_rows,
            r#"<div class="gap-row">
<div class="gap-name">{name}</div>
<div class="gap-meta">Social signal: {social} &middot; 311 reports: {matched}</div>
</div>"#,
            name = html_escape(&gap.neighborhood),
            social = gap.social_posts,
            matched = gap.matched_requests,
        );
    }
    if gap_rows.is_empty() {
        gap_rows =
            r#"<div class="no-data">Fetch social posts to enable gap analysis</div>"#.to_owned();
    }

    format!(
        r#"<div id="sidebar">
<div class="sidebar-title">Baltimore 311</div>
<div class="sidebar-subtitle">Infrastructure Intelligence</div>
<div class="sidebar-meta">{date_range}</div>
<div class="summary-cards">
<div class="summary-card"><div class="card-num">{total_requests}</div><div class="card-label">total requests</div></div>
<div class="summary-card alert"><div class="card-num">{chronic}</div><div class="card-label">chronic hotspots</div></div>
<div class="summary-card danger"><div class="card-num">{high_priority}</div><div class="card-label">high priority</div></div>
<div class="summary-card gap"><div class="card-num">{gap_count}</div><div class="card-label">gap areas</div></div>
</div>
<div class="section">
<div class="section-title">Chronic Hotspots</div>
<div class="section-subtitle">Locations with repeated reports over time</div>
{hotspot_rows}
</div>
<div class="section">
<div class="section-title">By Neighborhood</div>
<div class="section-subtitle">Report volume with 90-day trend</div>
{neighborhood_rows}
</div>
<div class="section">
<div class="section-title">Fix Effectiveness by Category</div>
<div class="section-subtitle">Share of requests that look like re-reports after a closure</div>
{cat_rows}
</div>
<div class="section">
<div class="section-title">Gap Analysis</div>
<div class="section-subtitle">Social signal without 311 activity</div>
{gap_rows}
</div>
<div class="sidebar-footer">Generated {generated} &middot; Open Baltimore + r/baltimore</div>
</div>"#,
        total_requests = summary.total_requests,
        chronic = summary.chronic_hotspots,
        high_priority = summary.high_priority_hotspots,
        gap_count = summary.gap_neighborhoods,
        generated = summary.generated_at.format("%Y-%m-%d %H:%M"),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
