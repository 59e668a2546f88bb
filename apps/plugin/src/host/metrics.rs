//! Static font-metric renderer: a headless `Renderer` for running without an editor.
//!
//! Glyph widths are in em units grouped by glyph class, an intentional approximation of
//! real shaping. Height is `lines × line_height`, where lines come from greedy word wrap
//! per `\n`-separated paragraph. Words wider than the column overflow onto their own
//! line instead of breaking.
//!
//! Height never decreases as a prefix grows (earlier break decisions are unaffected by
//! later characters), which is what the splitter requires of any oracle.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;

use crate::host::{FontName, RenderError, Renderer, TextStyle};
use crate::reflow::splitter::OracleError;

// ────────────────────────────────────────────────────────────────────────────
// Metric tables
// ────────────────────────────────────────────────────────────────────────────

/// Width of CJK and other full-width glyphs, in em.
const FULLWIDTH_EM: f64 = 1.0;

/// Per-class glyph widths for one font family, in em units.
#[derive(Debug)]
pub struct FontMetricTable {
    pub name: &'static str,
    pub space: f64,
    /// i, l, j, f, t, r and thin punctuation.
    pub narrow: f64,
    pub lowercase: f64,
    pub uppercase: f64,
    pub digit: f64,
    /// m, w, M, W, @, %.
    pub wide: f64,
    pub punctuation: f64,
    /// Anything not covered above.
    pub fallback: f64,
}

impl FontMetricTable {
    pub fn glyph_width(&self, c: char) -> f64 {
        match c {
            ' ' | '\t' => self.space,
            'i' | 'j' | 'l' | 'f' | 't' | 'r' | 'I' | '!' | '|' | '.' | ',' | ':' | ';' | '\'' => {
                self.narrow
            }
            'm' | 'w' | 'M' | 'W' | '@' | '%' => self.wide,
            'A'..='Z' => self.uppercase,
            'a'..='z' => self.lowercase,
            '0'..='9' => self.digit,
            c if c.is_ascii_punctuation() => self.punctuation,
            c if is_fullwidth(c) => FULLWIDTH_EM,
            _ => self.fallback,
        }
    }

    /// Width of a string on a single line, in em units.
    pub fn measure_str(&self, s: &str) -> f64 {
        s.chars().map(|c| self.glyph_width(c)).sum()
    }

    /// Lines `text` occupies when wrapped at `width_em`. Empty text occupies none;
    /// every other paragraph, including an empty one, occupies at least one.
    pub fn wrapped_lines(&self, text: &str, width_em: f64) -> usize {
        if text.is_empty() {
            return 0;
        }
        text.split('\n')
            .map(|paragraph| self.paragraph_lines(paragraph, width_em))
            .sum()
    }

    fn paragraph_lines(&self, paragraph: &str, max_width: f64) -> usize {
        let mut lines = 1usize;
        let mut current_width = 0.0_f64;
        let mut first_on_line = true;

        for word in paragraph.split_whitespace() {
            let word_w = self.measure_str(word);
            let space_w = if first_on_line { 0.0 } else { self.space };

            if !first_on_line && current_width + space_w + word_w > max_width {
                lines += 1;
                current_width = word_w;
            } else {
                current_width += space_w + word_w;
                first_on_line = false;
            }
        }
        lines
    }
}

fn is_fullwidth(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6)
}

static SANS_TABLE: FontMetricTable = FontMetricTable {
    name: "sans",
    space: 0.27,
    narrow: 0.26,
    lowercase: 0.54,
    uppercase: 0.66,
    digit: 0.56,
    wide: 0.86,
    punctuation: 0.38,
    fallback: 0.55,
};

static SERIF_TABLE: FontMetricTable = FontMetricTable {
    name: "serif",
    space: 0.25,
    narrow: 0.27,
    lowercase: 0.47,
    uppercase: 0.66,
    digit: 0.50,
    wide: 0.78,
    punctuation: 0.33,
    fallback: 0.50,
};

static MONO_TABLE: FontMetricTable = FontMetricTable {
    name: "mono",
    space: 0.60,
    narrow: 0.60,
    lowercase: 0.60,
    uppercase: 0.60,
    digit: 0.60,
    wide: 0.60,
    punctuation: 0.60,
    fallback: 0.60,
};

const SERIF_FAMILIES: [&str; 7] = [
    "serif",
    "garamond",
    "georgia",
    "times",
    "baskerville",
    "merriweather",
    "playfair",
];

/// Picks a metric table by family name. Unknown families measure as sans.
pub fn metrics_for(family: &str) -> &'static FontMetricTable {
    let family = family.to_lowercase();
    if ["mono", "code", "courier"].iter().any(|k| family.contains(k)) {
        &MONO_TABLE
    } else if family.contains("sans") {
        &SANS_TABLE
    } else if SERIF_FAMILIES.iter().any(|k| family.contains(k)) {
        &SERIF_TABLE
    } else {
        &SANS_TABLE
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Renderer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MetricRenderer {
    latency: Duration,
    unavailable: HashSet<String>,
}

impl MetricRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated cost of each `measure` call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes `load_font` fail for `family`.
    pub fn without_font(mut self, family: &str) -> Self {
        self.unavailable.insert(family.to_string());
        self
    }
}

#[async_trait]
impl Renderer for MetricRenderer {
    async fn load_font(&self, font: &FontName) -> Result<(), RenderError> {
        if self.unavailable.contains(&font.family) {
            return Err(RenderError::FontUnavailable(font.clone()));
        }
        Ok(())
    }

    async fn measure(&self, text: &str, style: &TextStyle, width: f64) -> Result<f64, OracleError> {
        if !(width.is_finite() && width > 0.0) {
            return Err(OracleError::Failed(format!(
                "column width must be positive, got {width}"
            )));
        }
        if !(style.font_size.is_finite() && style.font_size > 0.0) {
            return Err(OracleError::Failed(format!(
                "font size must be positive, got {}",
                style.font_size
            )));
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let table = metrics_for(&style.font.family);
        let lines = table.wrapped_lines(text, width / style.font_size);
        Ok(lines as f64 * style.line_height.to_pixels(style.font_size))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
