//! Popup and stats panel content.
//!
//! Single activities render into a popup on click; the aggregate over the
//! whole track renders into the persistent panel on every refresh.

use crate::fields::{self, DATE_KEYS, NAME_KEYS, TYPE_KEYS};
use crate::format::{format_distance, format_duration, format_duration_opt, format_elevation, format_timestamp, PLACEHOLDER};
use crate::{Track, TrackFeature};
use serde_json::{Map, Value};

/// Fixed-field view of one activity's properties.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivitySummary {
    pub name: Option<String>,
    pub activity_type: Option<String>,
    pub start_date: Option<String>,
    pub distance_m: Option<f64>,
    pub duration_s: Option<f64>,
    pub elevation_m: Option<f64>,
}

impl ActivitySummary {
    pub fn from_properties(properties: &Map<String, Value>) -> Self {
        Self {
            name: fields::first_text(properties, NAME_KEYS).map(str::to_owned),
            activity_type: fields::first_text(properties, TYPE_KEYS).map(str::to_owned),
            start_date: fields::first_text(properties, DATE_KEYS).map(str::to_owned),
            distance_m: fields::distance(properties),
            duration_s: fields::duration(properties),
            elevation_m: fields::elevation(properties),
        }
    }

    pub fn from_feature(feature: &TrackFeature) -> Self {
        Self::from_properties(&feature.properties)
    }

    fn title(&self) -> &str {
        self.name
            .as_deref()
            .or(self.activity_type.as_deref())
            .unwrap_or("Activity")
    }

    fn date_text(&self) -> String {
        self.start_date
            .as_deref()
            .map_or_else(|| PLACEHOLDER.to_string(), format_timestamp)
    }
}

/// Popup HTML for a single activity.
pub fn render_popup(summary: &ActivitySummary) -> String {
    let rows = [
        ("Type", summary.activity_type.clone().unwrap_or_else(|| PLACEHOLDER.to_string())),
        ("Date", summary.date_text()),
        ("Distance", format_distance(summary.distance_m)),
        ("Duration", format_duration_opt(summary.duration_s)),
        ("Elevation", format_elevation(summary.elevation_m)),
    ];

    let mut html = format!(
        "<div class=\"tracker-popup\"><div class=\"tracker-popup-title\">{}</div>",
        escape_html(summary.title())
    );
    push_rows(&mut html, &rows);
    html.push_str("</div>");
    html
}

/// Aggregate over every activity in the track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackTotals {
    pub activities: usize,
    pub distance_m: f64,
    pub duration_s: f64,
    /// Sum over activities that report elevation
    pub elevation_m: f64,
    /// Number of activities that report elevation
    pub elevation_count: usize,
    pub most_recent: Option<ActivitySummary>,
}

impl TrackTotals {
    /// Sum the quantities; absent values contribute nothing and are not
    /// counted for elevation.
    ///
    /// The most recent activity is the greatest start date by plain string
    /// comparison, with a missing date sorting first. Ties go to the later
    /// feature.
    pub fn from_track(track: &Track) -> Self {
        let summaries: Vec<ActivitySummary> = track.features.iter().map(ActivitySummary::from_feature).collect();
        Self::from_summaries(summaries)
    }

    pub fn from_summaries(summaries: Vec<ActivitySummary>) -> Self {
        let mut totals = Self { activities: summaries.len(), ..Self::default() };

        for s in &summaries {
            totals.distance_m += s.distance_m.unwrap_or(0.0);
            totals.duration_s += s.duration_s.unwrap_or(0.0);
            if let Some(elev) = s.elevation_m {
                totals.elevation_m += elev;
                totals.elevation_count += 1;
            }
        }

        totals.most_recent = summaries
            .into_iter()
            .max_by(|a, b| date_key(a).cmp(date_key(b)));

        totals
    }
}

fn date_key(summary: &ActivitySummary) -> &str {
    summary.start_date.as_deref().unwrap_or("")
}

/// The feature behind [`TrackTotals::most_recent`], same ordering rules.
pub fn most_recent_feature(track: &Track) -> Option<&TrackFeature> {
    track
        .features
        .iter()
        .max_by(|a, b| feature_date(a).cmp(feature_date(b)))
}

fn feature_date(feature: &TrackFeature) -> &str {
    fields::first_text(&feature.properties, DATE_KEYS).unwrap_or("")
}

/// Stats panel HTML.
pub fn render_panel(totals: &TrackTotals) -> String {
    let elevation = if totals.elevation_count > 0 {
        format_elevation(Some(totals.elevation_m))
    } else {
        PLACEHOLDER.to_string()
    };
    let latest = match &totals.most_recent {
        Some(s) => format!("{} ({})", s.title(), s.date_text()),
        None => PLACEHOLDER.to_string(),
    };

    let rows = [
        ("Activities", totals.activities.to_string()),
        ("Distance", format_distance(Some(totals.distance_m))),
        ("Moving time", format_duration(totals.duration_s)),
        ("Elevation", elevation),
        ("Latest", latest),
    ];

    let mut html = String::from("<div class=\"tracker-panel\">");
    push_rows(&mut html, &rows);
    html.push_str("</div>");
    html
}

fn push_rows(html: &mut String, rows: &[(&str, String)]) {
    for (label, value) in rows {
        html.push_str(&format!(
            "<div class=\"row\"><span>{}</span><b>{}</b></div>",
            label,
            escape_html(value)
        ));
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary(props: Value) -> ActivitySummary {
        ActivitySummary::from_properties(props.as_object().unwrap())
    }

    #[test]
    fn test_elevation_excludes_absent() {
        let totals = TrackTotals::from_summaries(vec![
            summary(json!({ "elev": 100 })),
            summary(json!({ "elev": null })),
            summary(json!({ "elev": 50 })),
        ]);
        assert_eq!(totals.elevation_m, 150.0);
        assert_eq!(totals.elevation_count, 2);
        assert_eq!(totals.activities, 3);
    }

    #[test]
    fn test_sums_present_values() {
        let totals = TrackTotals::from_summaries(vec![
            summary(json!({ "distance_m": 1000, "moving_time_s": 60 })),
            summary(json!({ "distance": 500 })),
            summary(json!({})),
        ]);
        assert_eq!(totals.distance_m, 1500.0);
        assert_eq!(totals.duration_s, 60.0);
        assert_eq!(totals.elevation_count, 0);
    }

    #[test]
    fn test_most_recent_by_date_string() {
        let totals = TrackTotals::from_summaries(vec![
            summary(json!({ "name": "b", "start_date": "2024-03-01T08:00:00Z" })),
            summary(json!({ "name": "undated" })),
            summary(json!({ "name": "c", "start_date": "2024-05-10T08:00:00Z" })),
            summary(json!({ "name": "a", "start_date": "2023-12-31T08:00:00Z" })),
        ]);
        assert_eq!(totals.most_recent.unwrap().name.as_deref(), Some("c"));
    }

    #[test]
    fn test_missing_date_sorts_first() {
        let totals = TrackTotals::from_summaries(vec![
            summary(json!({ "name": "dated", "start_date": "2020-01-01" })),
            summary(json!({ "name": "undated" })),
        ]);
        assert_eq!(totals.most_recent.unwrap().name.as_deref(), Some("dated"));
    }

    #[test]
    fn test_empty_totals() {
        let totals = TrackTotals::from_summaries(Vec::new());
        assert_eq!(totals.activities, 0);
        assert!(totals.most_recent.is_none());
        let html = render_panel(&totals);
        assert!(html.contains("<span>Elevation</span><b>—</b>"));
    }

    #[test]
    fn test_popup_fields() {
        let s = summary(json!({
            "name": "Evening <Ride>",
            "type": "Ride",
            "distance_m": 12345,
            "moving_time_s": 3725,
        }));
        let html = render_popup(&s);
        assert!(html.contains("Evening &lt;Ride&gt;"));
        assert!(html.contains("<span>Type</span><b>Ride</b>"));
        assert!(html.contains("<span>Distance</span><b>12.3 km · 7.67 mi</b>"));
        assert!(html.contains("<span>Duration</span><b>1h 02m</b>"));
        assert!(html.contains("<span>Elevation</span><b>—</b>"));
        assert!(html.contains("<span>Date</span><b>—</b>"));
    }

    #[test]
    fn test_most_recent_feature() {
        let track = Track::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "start_date": "2024-03-01" }, "geometry": null },
                { "type": "Feature", "properties": { "start_date": "2024-05-01" }, "geometry": null },
                { "type": "Feature", "properties": {}, "geometry": null }
            ]
        }))
        .unwrap();
        assert_eq!(most_recent_feature(&track).map(|f| f.id), Some(1));
        assert!(most_recent_feature(&Track::default()).is_none());
    }
}
