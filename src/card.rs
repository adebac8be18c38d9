//! SVG rendering of a birthday sensor as a dashboard card.

use serde::{Deserialize, Serialize};

use crate::error::{BirthdayError, Result};
use crate::scheduler::StateBoard;
use crate::sensor::{
    ATTR_AGE_EXACT, ATTR_NAME, ATTR_NEXT_BIRTHDAY, ATTR_NEXT_BIRTHDAY_DATETIME,
    ATTR_TIME_UNTIL_NEXT, ATTR_TIME_UNTIL_NEXT_DETAILED, SensorState,
};

const CARD_WIDTH: f32 = 420.0;
const PADDING: f32 = 20.0;
const TITLE_Y: f32 = 36.0;
const LINE_HEIGHT: f32 = 20.0;
const RING_RADIUS: f32 = 64.0;
const RING_STROKE: f32 = 12.0;
const BAR_HEIGHT: f32 = 18.0;
const PANEL_GAP: f32 = 12.0;
const PANEL_MIN_HEIGHT: f32 = 120.0;

/// Shown for any attribute the sensor did not publish.
const MISSING: &str = "N/A";
const DEFAULT_NEXT_TITLE: &str = "Next Birthday";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

pub struct ThemeColors {
    pub bg: &'static str,
    pub text: &'static str,
    pub key: &'static str,
    pub value: &'static str,
    pub cc: &'static str,
}

impl Theme {
    pub fn colors(self) -> ThemeColors {
        match self {
            Theme::Dark => ThemeColors {
                bg: "#161b22",
                text: "#c9d1d9",
                key: "#ffa657",
                value: "#a5d6ff",
                cc: "#30363d",
            },
            Theme::Light => ThemeColors {
                bg: "#ffffff",
                text: "#24292f",
                key: "#d73a49",
                value: "#0366d6",
                cc: "#d0d7de",
            },
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressType {
    #[default]
    Circular,
    Horizontal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Progress,
    Panels,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardConfig {
    pub entity: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub progress_type: ProgressType,
    #[serde(default)]
    pub next_birthday_title: Option<String>,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub theme: Theme,
}

impl CardConfig {
    pub fn for_entity(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            name: None,
            progress_type: ProgressType::default(),
            next_birthday_title: None,
            layout: Layout::default(),
            theme: Theme::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.entity.trim().is_empty() {
            return Err(BirthdayError::InvalidInput(
                "card configuration requires an entity".into(),
            ));
        }
        Ok(())
    }
}

/// Text the card shows, with presentation defaults applied.
struct CardText {
    title: String,
    percentage: Option<f64>,
    age: String,
    next_title: String,
    next_birthday: String,
    countdown: String,
}

impl CardText {
    fn new(config: &CardConfig, state: &SensorState) -> Self {
        let attr = |key: &str| state.attribute_str(key).map(str::to_string);

        Self {
            title: config
                .name
                .clone()
                .or_else(|| attr(ATTR_NAME))
                .unwrap_or_else(|| state.friendly_name.clone()),
            percentage: state.state,
            age: attr(ATTR_AGE_EXACT).unwrap_or_else(|| MISSING.into()),
            next_title: config
                .next_birthday_title
                .clone()
                .unwrap_or_else(|| DEFAULT_NEXT_TITLE.into()),
            next_birthday: attr(ATTR_NEXT_BIRTHDAY_DATETIME)
                .or_else(|| attr(ATTR_NEXT_BIRTHDAY))
                .unwrap_or_else(|| MISSING.into()),
            countdown: attr(ATTR_TIME_UNTIL_NEXT_DETAILED)
                .or_else(|| attr(ATTR_TIME_UNTIL_NEXT))
                .unwrap_or_else(|| MISSING.into()),
        }
    }

    fn percentage_label(&self) -> String {
        match self.percentage {
            Some(p) => format!("{p:.2}%"),
            None => MISSING.to_string(),
        }
    }

    fn fraction(&self) -> f32 {
        self.percentage.map(|p| (p / 100.0).clamp(0.0, 1.0) as f32).unwrap_or(0.0)
    }
}

// Utilities for building SVG content

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Splits a long breakdown like "8 years, 2 months, and 3 days" into one line
/// per unit.
fn breakdown_lines(text: &str) -> Vec<String> {
    text.split(", ")
        .map(|part| part.trim_start_matches("and ").to_string())
        .collect()
}

fn text_line(x: f32, y: f32, class: &str, anchor: &str, content: &str) -> String {
    format!(
        "<text x=\"{x}\" y=\"{y}\" class=\"{class}\" text-anchor=\"{anchor}\">{}</text>\n",
        escape_xml(content)
    )
}

fn build_details(text: &CardText, top: f32) -> (String, f32) {
    let mut out = String::new();
    let mut y = top;
    for (label, value) in [
        ("Age", text.age.as_str()),
        (text.next_title.as_str(), text.next_birthday.as_str()),
        ("Countdown", text.countdown.as_str()),
    ] {
        out.push_str(&text_line(PADDING, y, "key", "start", label));
        y += LINE_HEIGHT;
        out.push_str(&text_line(PADDING, y, "value", "start", value));
        y += LINE_HEIGHT * 1.5;
    }
    (out, y)
}

fn build_circular(text: &CardText) -> (String, f32) {
    let cx = CARD_WIDTH / 2.0;
    let cy = TITLE_Y + PADDING + RING_RADIUS + RING_STROKE;
    let circumference = 2.0 * std::f32::consts::PI * RING_RADIUS;
    let offset = circumference * (1.0 - text.fraction());

    let mut out = format!(
        r#"<circle cx="{cx}" cy="{cy}" r="{RING_RADIUS}" class="track" stroke-width="{RING_STROKE}" fill="none"/>
<circle cx="{cx}" cy="{cy}" r="{RING_RADIUS}" class="fill" stroke-width="{RING_STROKE}" fill="none" stroke-linecap="round" stroke-dasharray="{circumference:.3}" stroke-dashoffset="{offset:.3}" transform="rotate(-90 {cx} {cy})"/>
"#
    );
    out.push_str(&text_line(cx, cy + 6.0, "pct", "middle", &text.percentage_label()));

    let (details, bottom) = build_details(text, cy + RING_RADIUS + RING_STROKE + PADDING * 1.5);
    out.push_str(&details);
    (out, bottom)
}

fn build_horizontal(text: &CardText) -> (String, f32) {
    let track_width = CARD_WIDTH - 2.0 * PADDING;
    let fill_width = track_width * text.fraction();
    let bar_y = TITLE_Y + PADDING;

    let mut out = format!(
        r#"<rect x="{PADDING}" y="{bar_y}" width="{track_width}" height="{BAR_HEIGHT}" rx="{r}" class="track-rect"/>
<rect x="{PADDING}" y="{bar_y}" width="{fill_width:.3}" height="{BAR_HEIGHT}" rx="{r}" class="fill-rect"/>
"#,
        r = BAR_HEIGHT / 2.0
    );
    out.push_str(&text_line(
        CARD_WIDTH - PADDING,
        bar_y + BAR_HEIGHT + LINE_HEIGHT,
        "pct-small",
        "end",
        &text.percentage_label(),
    ));

    let (details, bottom) = build_details(text, bar_y + BAR_HEIGHT + LINE_HEIGHT * 2.5);
    out.push_str(&details);
    (out, bottom)
}

fn build_panel(x: f32, y: f32, width: f32, title: &str, lines: &[String]) -> (String, f32) {
    let height = (lines.len() as f32 + 2.0) * LINE_HEIGHT;
    let height = height.max(PANEL_MIN_HEIGHT);

    let mut out = format!(
        "<rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" rx=\"8\" class=\"panel\"/>\n"
    );
    let cx = x + width / 2.0;
    out.push_str(&text_line(cx, y + LINE_HEIGHT * 1.25, "key", "middle", title));
    for (i, line) in lines.iter().enumerate() {
        let ly = y + LINE_HEIGHT * (i as f32 + 2.5);
        out.push_str(&text_line(cx, ly, "value", "middle", line));
    }
    (out, height)
}

fn build_panels(text: &CardText) -> (String, f32) {
    let panel_width = (CARD_WIDTH - 2.0 * PADDING - PANEL_GAP) / 2.0;
    let top = TITLE_Y + PADDING;

    let mut right_lines = vec![text.next_birthday.clone()];
    right_lines.extend(breakdown_lines(&text.countdown));

    let (left, left_h) = build_panel(PADDING, top, panel_width, "Age", &breakdown_lines(&text.age));
    let (right, right_h) = build_panel(
        PADDING + panel_width + PANEL_GAP,
        top,
        panel_width,
        &text.next_title,
        &right_lines,
    );

    let mut out = left;
    out.push_str(&right);
    let bottom = top + left_h.max(right_h) + PADDING;
    out.push_str(&text_line(
        CARD_WIDTH / 2.0,
        bottom,
        "pct-small",
        "middle",
        &text.percentage_label(),
    ));
    (out, bottom + LINE_HEIGHT)
}

fn wrap_card(theme: Theme, title: &str, body: &str, height: f32) -> String {
    let colors = theme.colors();
    format!(
        r#"<?xml version='1.0' encoding='UTF-8'?>
<svg xmlns="http://www.w3.org/2000/svg"
     width="{w}px" height="{h}px"
     font-family="Roboto,Noto,sans-serif"
     font-size="14px">

<style>
.title      {{ fill: {text}; font-size: 18px; font-weight: bold; }}
.key        {{ fill: {key}; }}
.value      {{ fill: {value}; }}
.pct        {{ fill: {text}; font-size: 22px; font-weight: bold; }}
.pct-small  {{ fill: {text}; }}
.track      {{ stroke: {cc}; }}
.fill       {{ stroke: {key}; }}
.track-rect {{ fill: {cc}; }}
.fill-rect  {{ fill: {key}; }}
.panel      {{ fill: none; stroke: {cc}; }}
</style>

<rect width="{w}px" height="{h}px" fill="{bg}" rx="15"/>
{title_line}{body}</svg>
"#,
        w = CARD_WIDTH,
        h = height,
        bg = colors.bg,
        text = colors.text,
        key = colors.key,
        value = colors.value,
        cc = colors.cc,
        title_line = text_line(PADDING, TITLE_Y, "title", "start", title),
        body = body,
    )
}

/// Placeholder card for an entity that has not been published.
pub fn render_placeholder(config: &CardConfig) -> String {
    let message = format!("Entity not found: {}", config.entity);
    let body = text_line(PADDING, TITLE_Y + LINE_HEIGHT * 2.0, "value", "start", &message);
    wrap_card(
        config.theme,
        config.name.as_deref().unwrap_or("Birthday Progress"),
        &body,
        TITLE_Y + LINE_HEIGHT * 3.5,
    )
}

/// Renders the card for `config.entity` from the latest published states.
pub fn render(config: &CardConfig, board: &StateBoard) -> String {
    let Some(state) = board.get(&config.entity) else {
        tracing::debug!("Card entity {} not on the board", config.entity);
        return render_placeholder(config);
    };

    let text = CardText::new(config, state);
    let (body, bottom) = match (config.layout, config.progress_type) {
        (Layout::Panels, _) => build_panels(&text),
        (Layout::Progress, ProgressType::Circular) => build_circular(&text),
        (Layout::Progress, ProgressType::Horizontal) => build_horizontal(&text),
    };

    wrap_card(config.theme, &text.title, &body, bottom + PADDING)
}
