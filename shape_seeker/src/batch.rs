// THEORY:
// Batch mode replays a prepared list of searches against the camera without an
// operator. Each non-comment line of a batch file names one (shape, color) pair;
// for each one a single fresh frame is grabbed, searched, shown for a moment, and
// then the runner idles before the next line.
//
// Grammar of a line:
// 1.  Blank lines and lines starting with `#` are skipped.
// 2.  Anything after an inline `#` is dropped.
// 3.  The rest is split on whitespace. Fewer than two words: skipped.
// 4.  The last word is the color; the words before it, joined by single spaces,
//     are the shape. Both are lowercased.
//
// Parsing does not check names against the vocabulary. An unknown shape or color
// is still a batch entry: it consumes a frame and is shown as an inactive frame,
// so the rhythm of a batch does not depend on typos.

use crate::config::BatchSettings;
use crate::controller::{ContourExtractor, FrameSink, FrameSource, FrameView, SinkSignal};
use crate::core_modules::vocabulary::{split_query_words, Query};
use crate::error::Result;
use crate::session::DetectionSession;
use log::{info, warn};
use std::path::Path;
use std::thread;
use std::time::Instant;

/// One searchable line of a batch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// 1-based line in the source text.
    pub line: usize,
    pub shape: String,
    pub color: String,
}

impl BatchEntry {
    /// Validates the entry against the vocabulary.
    pub fn query(&self) -> Result<Query> {
        Query::from_names(&self.shape, &self.color)
    }
}

pub fn parse_batch(text: &str) -> Vec<BatchEntry> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|(index, line)| {
            let content = match line.find('#') {
                Some(comment) => &line[..comment],
                None => line,
            };
            let (shape, color) = split_query_words(content)?;
            Some(BatchEntry {
                line: index + 1,
                shape,
                color,
            })
        })
        .collect()
}

pub fn read_batch_file(path: &Path) -> Result<Vec<BatchEntry>> {
    let text = std::fs::read_to_string(path)?;
    let entries = parse_batch(&text);
    info!("loaded {} batch entries from {}", entries.len(), path.display());
    Ok(entries)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    /// Entries that got a frame.
    pub processed: usize,
    /// Entries with a valid query.
    pub searched: usize,
    /// Entries whose search found at least one match.
    pub found: usize,
}

/// Runs every entry against one fresh frame each. Acquisition failure ends the
/// batch with an error; the source and sink are released in every case.
pub fn run_batch<S, E, K>(
    entries: &[BatchEntry],
    source: &mut S,
    extractor: &mut E,
    sink: &mut K,
    settings: &BatchSettings,
) -> Result<BatchSummary>
where
    S: FrameSource,
    E: ContourExtractor<S::Frame>,
    K: FrameSink<S::Frame>,
{
    let result = run_entries(entries, source, extractor, sink, settings);
    source.release();
    sink.release();
    result
}

fn run_entries<S, E, K>(
    entries: &[BatchEntry],
    source: &mut S,
    extractor: &mut E,
    sink: &mut K,
    settings: &BatchSettings,
) -> Result<BatchSummary>
where
    S: FrameSource,
    E: ContourExtractor<S::Frame>,
    K: FrameSink<S::Frame>,
{
    let session = DetectionSession::new();
    let mut summary = BatchSummary::default();

    for (position, entry) in entries.iter().enumerate() {
        if position > 0 && !settings.pause.is_zero() {
            thread::sleep(settings.pause);
        }

        let mut frame = source.next_frame()?;
        let begin = Instant::now();
        summary.processed += 1;

        let view = match entry.query() {
            Ok(query) => {
                summary.searched += 1;
                let boundaries = extractor.extract(&frame)?;
                let report = session.run_from(begin, &frame, &boundaries, query);
                if report.is_found() {
                    summary.found += 1;
                }
                FrameView::Searched {
                    query,
                    boundaries,
                    report,
                }
            }
            Err(err) => {
                warn!("batch line {}: {}", entry.line, err);
                FrameView::Inactive
            }
        };

        if sink.present(&mut frame, &view)? == SinkSignal::Stop {
            info!("batch interrupted after {} entries", summary.processed);
            break;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::geometry::Boundary;
    use crate::session::Report;
    use image::RgbImage;
    use std::time::Duration;

    /// A camera that takes a quarter of a second to deliver each frame.
    struct SlowCamera;

    impl FrameSource for SlowCamera {
        type Frame = RgbImage;

        fn next_frame(&mut self) -> Result<RgbImage> {
            thread::sleep(Duration::from_millis(250));
            Ok(RgbImage::new(64, 64))
        }
    }

    struct NoContours;

    impl ContourExtractor<RgbImage> for NoContours {
        fn extract(&mut self, _frame: &RgbImage) -> Result<Vec<Boundary>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct ElapsedSink {
        elapsed: Vec<Duration>,
    }

    impl FrameSink<RgbImage> for ElapsedSink {
        fn present(&mut self, _frame: &mut RgbImage, view: &FrameView) -> Result<SinkSignal> {
            if let FrameView::Searched { report, .. } = view {
                if let Report::NotFound { elapsed } = report.report {
                    self.elapsed.push(elapsed);
                }
            }
            Ok(SinkSignal::Continue)
        }
    }

    #[test]
    fn reported_time_excludes_waiting_for_the_camera() {
        let entries = parse_batch("vierkant groen\n");
        let settings = BatchSettings {
            pause: Duration::ZERO,
            ..BatchSettings::default()
        };
        let mut sink = ElapsedSink::default();

        let summary = run_batch(&entries, &mut SlowCamera, &mut NoContours, &mut sink, &settings)
            .unwrap();

        assert_eq!(summary.searched, 1);
        assert_eq!(sink.elapsed.len(), 1);
        assert!(sink.elapsed[0] < Duration::from_millis(100), "{:?}", sink.elapsed);
    }

    #[test]
    fn comments_blank_and_short_lines_are_skipped() {
        let text = "\
# calibration run
vierkant groen

driehoek   # missing color
cirkel roze # trailing note
   # indented comment
geel
";
        let entries = parse_batch(text);
        assert_eq!(
            entries,
            vec![
                BatchEntry {
                    line: 2,
                    shape: "vierkant".into(),
                    color: "groen".into(),
                },
                BatchEntry {
                    line: 5,
                    shape: "cirkel".into(),
                    color: "roze".into(),
                },
            ]
        );
    }

    #[test]
    fn multi_word_shapes_are_joined_and_lowercased() {
        let entries = parse_batch("Halve   Cirkel  ORANJE\n");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].shape, "halve cirkel");
        assert_eq!(entries[0].color, "oranje");
        assert!(entries[0].query().is_ok());
    }

    #[test]
    fn unknown_names_still_parse_but_do_not_validate() {
        let entries = parse_batch("ster rood\n");
        assert_eq!(entries.len(), 1);
        assert!(entries[0].query().is_err());
    }

    #[test]
    fn windows_line_endings_are_tolerated() {
        let entries = parse_batch("rechthoek geel\r\ndriehoek groen\r\n");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].color, "geel");
        assert_eq!(entries[1].shape, "driehoek");
    }
}
