//! Binds a host `Renderer` to one character sequence and style so the splitter can
//! ask for heights by prefix length alone.

use async_trait::async_trait;

use crate::host::{Renderer, TextStyle};
use crate::reflow::splitter::{MeasurementOracle, OracleError};

pub struct TextOracle<'a, R: ?Sized> {
    characters: &'a [char],
    style: &'a TextStyle,
    renderer: &'a R,
}

impl<'a, R: Renderer + ?Sized> TextOracle<'a, R> {
    pub fn new(characters: &'a [char], style: &'a TextStyle, renderer: &'a R) -> Self {
        TextOracle {
            characters,
            style,
            renderer,
        }
    }
}

#[async_trait]
impl<'a, R: Renderer + ?Sized> MeasurementOracle for TextOracle<'a, R> {
    async fn measure(&self, prefix_len: usize, column_width: f64) -> Result<f64, OracleError> {
        let end = prefix_len.min(self.characters.len());
        let prefix: String = self.characters[..end].iter().collect();
        self.renderer.measure(&prefix, self.style, column_width).await
    }
}
