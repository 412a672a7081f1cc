//! Ordered fallback chain: table strategies, then text extractors, then a placeholder

use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};

use super::grid::GridStrategy;
use super::heuristic::HeuristicStrategy;
use super::text::{clean_text, panic_message, PrimaryTextExtractor, SecondaryTextExtractor};
use super::{
    CancelFlag, ExtractionError, PdfSource, StrategyKind, Table, TableStrategy, TextExtractor,
};
use crate::config::{Deployment, ExtractionConfig};
use crate::types::ExtractionResult;

/// Single-cell content written when nothing can be extracted
pub const PLACEHOLDER_MESSAGE: &str = "No extractable tables or text were found in this PDF.";

/// Which step produced an extraction result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", content = "name", rename_all = "lowercase")]
pub enum ExtractionSource {
    Table(StrategyKind),
    Text(&'static str),
    Placeholder,
}

/// A result and the step it came from
#[derive(Debug, Clone)]
pub struct Extraction {
    pub result: ExtractionResult,
    pub source: ExtractionSource,
}

/// Table strategies usable in this process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub grid: bool,
    pub heuristic: bool,
}

impl Capabilities {
    /// Determine available strategies once at startup
    pub fn detect(config: &ExtractionConfig) -> Self {
        if !config.grid_enabled {
            tracing::warn!("Grid table extraction disabled; using heuristic extraction only");
        }
        Self {
            grid: config.grid_enabled,
            heuristic: true,
        }
    }

    /// Attempt order. Hosted deployments, a missing grid strategy, or an explicit
    /// preference put the heuristic strategy first.
    pub fn strategy_order(&self, config: &ExtractionConfig) -> Vec<StrategyKind> {
        let heuristic_first =
            config.deployment == Deployment::Hosted || !self.grid || config.heuristic_first;

        let preferred = if heuristic_first {
            [StrategyKind::Heuristic, StrategyKind::Grid]
        } else {
            [StrategyKind::Grid, StrategyKind::Heuristic]
        };

        preferred
            .into_iter()
            .filter(|kind| match kind {
                StrategyKind::Grid => self.grid,
                StrategyKind::Heuristic => self.heuristic,
            })
            .collect()
    }
}

/// Strategies and text extractors in attempt order
pub struct FallbackChain {
    strategies: Vec<Box<dyn TableStrategy>>,
    text_extractors: Vec<Box<dyn TextExtractor>>,
}

impl FallbackChain {
    pub fn new(
        strategies: Vec<Box<dyn TableStrategy>>,
        text_extractors: Vec<Box<dyn TextExtractor>>,
    ) -> Self {
        Self {
            strategies,
            text_extractors,
        }
    }

    /// Build the chain for this deployment
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let capabilities = Capabilities::detect(config);
        let order = capabilities.strategy_order(config);
        tracing::info!("Table extraction order: {:?}", order);

        let strategies = order
            .into_iter()
            .map(|kind| -> Box<dyn TableStrategy> {
                match kind {
                    StrategyKind::Grid => Box::new(GridStrategy::default()),
                    StrategyKind::Heuristic => Box::new(HeuristicStrategy::default()),
                }
            })
            .collect();

        let text_extractors: Vec<Box<dyn TextExtractor>> = vec![
            Box::new(PrimaryTextExtractor::new(config.text_timeout())),
            Box::new(SecondaryTextExtractor),
        ];

        Self::new(strategies, text_extractors)
    }

    pub fn strategy_order(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Load the PDF and run the chain. Only an unreadable PDF is an error.
    pub fn extract(&self, data: &[u8]) -> Result<Extraction, ExtractionError> {
        self.extract_with_cancel(data, CancelFlag::default())
    }

    /// Like [`extract`](Self::extract), stopping with `Cancelled` once `cancel` is set
    pub fn extract_with_cancel(
        &self,
        data: &[u8],
        cancel: CancelFlag,
    ) -> Result<Extraction, ExtractionError> {
        let source = PdfSource::load_with_cancel(data, cancel)?;
        self.extract_from(&source)
    }

    /// Run the chain over a loaded PDF. Yields exactly one result unless the source is
    /// cancelled, in which case no further step is started.
    pub fn extract_from(&self, source: &PdfSource) -> Result<Extraction, ExtractionError> {
        let tables = first_success(
            source.cancel_flag(),
            &self.strategies,
            |s| format!("{} table extraction", s.kind()),
            |s| {
                let tables: Vec<Table> = s
                    .extract_tables(source)?
                    .into_iter()
                    .filter(|t| t.iter().any(|row| row.iter().any(|c| !c.is_empty())))
                    .collect();
                if tables.is_empty() {
                    Err(ExtractionError::NoTables)
                } else {
                    Ok(tables)
                }
            },
        )?;
        if let Some((strategy, tables)) = tables {
            let kind = strategy.kind();
            tracing::info!("Extracted {} tables with {} strategy", tables.len(), kind);
            return Ok(Extraction {
                result: ExtractionResult::from_tables(tables),
                source: ExtractionSource::Table(kind),
            });
        }

        let pages = first_success(
            source.cancel_flag(),
            &self.text_extractors,
            |e| format!("{} text extraction", e.name()),
            |e| {
                let pages: Vec<(u32, String)> = e
                    .extract_pages(source)?
                    .iter()
                    .enumerate()
                    .filter_map(|(i, text)| {
                        let text = clean_text(text);
                        (!text.is_empty()).then(|| (i as u32 + 1, text))
                    })
                    .collect();
                if pages.is_empty() {
                    Err(ExtractionError::NoText)
                } else {
                    Ok(pages)
                }
            },
        )?;
        if let Some((extractor, pages)) = pages {
            tracing::info!(
                "No tables found; extracted text from {} pages with {}",
                pages.len(),
                extractor.name()
            );
            return Ok(Extraction {
                result: ExtractionResult::from_page_text(pages),
                source: ExtractionSource::Text(extractor.name()),
            });
        }

        tracing::warn!("No tables or text found; writing placeholder");
        Ok(Extraction {
            result: ExtractionResult::placeholder(PLACEHOLDER_MESSAGE),
            source: ExtractionSource::Placeholder,
        })
    }
}

/// Try each step in order and return the first success. Failures, including panics,
/// are logged and the next step is tried. Cancellation ends the search with an error.
fn first_success<'a, S: ?Sized, T>(
    cancel: &CancelFlag,
    steps: &'a [Box<S>],
    label: impl Fn(&S) -> String,
    run: impl Fn(&S) -> Result<T, ExtractionError>,
) -> Result<Option<(&'a S, T)>, ExtractionError> {
    for step in steps {
        cancel.check()?;
        let step: &S = step.as_ref();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| run(step)))
            .unwrap_or_else(|payload| Err(ExtractionError::Panicked(panic_message(payload.as_ref()))));

        match outcome {
            Ok(value) => return Ok(Some((step, value))),
            Err(e) => {
                cancel.check()?;
                tracing::warn!("{} failed: {}", label(step), e);
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{aligned_rows, ruled_table, text, PdfFixture};

    struct Fixed(StrategyKind, Result<Vec<Table>, ExtractionError>);

    impl TableStrategy for Fixed {
        fn kind(&self) -> StrategyKind {
            self.0
        }
        fn extract_tables(&self, _: &PdfSource) -> Result<Vec<Table>, ExtractionError> {
            self.1.clone()
        }
    }

    struct Panicking;

    impl TableStrategy for Panicking {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Grid
        }
        fn extract_tables(&self, _: &PdfSource) -> Result<Vec<Table>, ExtractionError> {
            panic!("malformed content stream")
        }
    }

    struct Pages(&'static str, Result<Vec<String>, ExtractionError>);

    impl TextExtractor for Pages {
        fn name(&self) -> &'static str {
            self.0
        }
        fn extract_pages(&self, _: &PdfSource) -> Result<Vec<String>, ExtractionError> {
            self.1.clone()
        }
    }

    fn table(rows: &[&[&str]]) -> Table {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn blank_source() -> PdfSource {
        PdfSource::load(&PdfFixture::new().page(vec![]).build()).unwrap()
    }

    fn config(deployment: Deployment, grid_enabled: bool, heuristic_first: bool) -> ExtractionConfig {
        ExtractionConfig {
            deployment,
            grid_enabled,
            heuristic_first,
            ..Default::default()
        }
    }

    #[test]
    fn test_strategy_order() {
        let local = config(Deployment::Local, true, false);
        assert_eq!(
            Capabilities::detect(&local).strategy_order(&local),
            vec![StrategyKind::Grid, StrategyKind::Heuristic]
        );

        let hosted = config(Deployment::Hosted, true, false);
        assert_eq!(
            Capabilities::detect(&hosted).strategy_order(&hosted),
            vec![StrategyKind::Heuristic, StrategyKind::Grid]
        );

        let preferred = config(Deployment::Local, true, true);
        assert_eq!(
            Capabilities::detect(&preferred).strategy_order(&preferred),
            vec![StrategyKind::Heuristic, StrategyKind::Grid]
        );

        let no_grid = config(Deployment::Local, false, false);
        assert_eq!(
            Capabilities::detect(&no_grid).strategy_order(&no_grid),
            vec![StrategyKind::Heuristic]
        );
    }

    #[test]
    fn test_first_table_success_wins() {
        let chain = FallbackChain::new(
            vec![
                Box::new(Fixed(StrategyKind::Grid, Err(ExtractionError::Failed("bad".into())))),
                Box::new(Fixed(StrategyKind::Heuristic, Ok(vec![table(&[&["a", "b"], &["1", "2"]])]))),
            ],
            vec![Box::new(Pages("text", Ok(vec!["never used".into()])))],
        );
        let extraction = chain.extract_from(&blank_source()).unwrap();

        assert_eq!(extraction.source, ExtractionSource::Table(StrategyKind::Heuristic));
        assert_eq!(extraction.result.header, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(extraction.result.rows, vec![vec!["1".to_string(), "2".to_string()]]);
    }

    #[test]
    fn test_panicking_strategy_falls_through() {
        let chain = FallbackChain::new(
            vec![
                Box::new(Panicking),
                Box::new(Fixed(StrategyKind::Heuristic, Ok(vec![table(&[&["x"]])]))),
            ],
            vec![],
        );
        let extraction = chain.extract_from(&blank_source()).unwrap();
        assert_eq!(extraction.source, ExtractionSource::Table(StrategyKind::Heuristic));
    }

    #[test]
    fn test_empty_tables_fall_back_to_text() {
        let chain = FallbackChain::new(
            vec![Box::new(Fixed(StrategyKind::Grid, Ok(vec![table(&[&["", ""]])])))],
            vec![
                Box::new(Pages("primary", Err(ExtractionError::TimedOut(60)))),
                Box::new(Pages("secondary", Ok(vec!["".into(), " page two \n".into()]))),
            ],
        );
        let extraction = chain.extract_from(&blank_source()).unwrap();

        assert_eq!(extraction.source, ExtractionSource::Text("secondary"));
        assert_eq!(
            extraction.result.rows,
            vec![vec!["Page 2".to_string(), "page two".to_string()]]
        );
    }

    #[test]
    fn test_placeholder_when_everything_fails() {
        let chain = FallbackChain::new(
            vec![Box::new(Fixed(StrategyKind::Grid, Ok(vec![])))],
            vec![Box::new(Pages("primary", Ok(vec!["  ".into()])))],
        );
        let extraction = chain.extract_from(&blank_source()).unwrap();

        assert_eq!(extraction.source, ExtractionSource::Placeholder);
        assert_eq!(extraction.result.rows, vec![vec![PLACEHOLDER_MESSAGE.to_string()]]);
        assert!(extraction.result.header.is_none());
    }

    /// Gives up after flagging its own job as cancelled
    struct CancelsJob;

    impl TableStrategy for CancelsJob {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Grid
        }
        fn extract_tables(&self, source: &PdfSource) -> Result<Vec<Table>, ExtractionError> {
            source.cancel_flag().cancel();
            Err(ExtractionError::NoTables)
        }
    }

    #[test]
    fn test_cancellation_stops_the_chain() {
        let chain = FallbackChain::new(
            vec![
                Box::new(CancelsJob),
                Box::new(Fixed(StrategyKind::Heuristic, Ok(vec![table(&[&["a"]])]))),
            ],
            vec![Box::new(Pages("text", Ok(vec!["never used".into()])))],
        );
        assert_eq!(
            chain.extract_from(&blank_source()).unwrap_err(),
            ExtractionError::Cancelled
        );

        let cancel = CancelFlag::new();
        cancel.cancel();
        let data = PdfFixture::new().page(text(72, 700, 12, "late")).build();
        assert_eq!(
            FallbackChain::from_config(&ExtractionConfig::default())
                .extract_with_cancel(&data, cancel)
                .unwrap_err(),
            ExtractionError::Cancelled
        );
    }

    #[test]
    fn test_load_failure_is_the_only_error() {
        let chain = FallbackChain::from_config(&ExtractionConfig::default());
        assert!(matches!(
            chain.extract(b"not a pdf"),
            Err(ExtractionError::Corrupted(_))
        ));
    }

    #[test]
    fn test_default_chain_on_real_pdfs() {
        let chain = FallbackChain::from_config(&ExtractionConfig::default());

        let ruled = PdfFixture::new()
            .page(ruled_table(72, 700, 120, 20, &[&["Item", "Qty"], &["Bolt", "4"]]))
            .build();
        let extraction = chain.extract(&ruled).unwrap();
        assert_eq!(extraction.source, ExtractionSource::Table(StrategyKind::Grid));
        assert_eq!(extraction.result.rows, vec![vec!["Bolt".to_string(), "4".to_string()]]);

        let unruled = PdfFixture::new()
            .page(aligned_rows(72, 700, 130, 16, &[&["Item", "Qty"], &["Nut", "8"]]))
            .build();
        let extraction = chain.extract(&unruled).unwrap();
        assert_eq!(extraction.source, ExtractionSource::Table(StrategyKind::Heuristic));

        let prose = PdfFixture::new()
            .page(text(72, 700, 12, "Quarterly summary without any tables"))
            .build();
        let extraction = chain.extract(&prose).unwrap();
        assert!(matches!(extraction.source, ExtractionSource::Text(_)));
        assert_eq!(extraction.result.rows[0][0], "Page 1");
        assert!(extraction.result.rows[0][1].contains("Quarterly"));

        let blank = PdfFixture::new().page(vec![]).build();
        let extraction = chain.extract(&blank).unwrap();
        assert_eq!(extraction.source, ExtractionSource::Placeholder);
    }
}
