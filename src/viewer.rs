//! Interactive sample viewer.
//!
//! Shows samples one at a time and asks after each whether to keep going.
//! An answer starting with `n` or `N` stops the loop; anything else,
//! including an empty line, moves on to the next sample.

use crate::dataset::Dataset;
use crate::error::Result;
use crate::render::FigureSink;
use std::io::{BufRead, ErrorKind, Write};
use tracing::{debug, warn};

/// Prompt written after every sample
pub const PROMPT: &str = "Continue displaying?\n";

/// Title shown above a sample with the given label.
#[must_use]
pub fn sample_title(label: u8) -> String {
    format!("Image of '{label}'")
}

/// Whether an answer asks the viewer to stop.
///
/// Only the first character counts, so `" n"` keeps going.
#[must_use]
pub fn should_stop(answer: &str) -> bool {
    matches!(answer.chars().next(), Some('n' | 'N'))
}

/// Show samples in order until the user declines or the dataset runs out.
///
/// Returns how many samples were shown.
///
/// # Errors
///
/// Propagates rendering failures and I/O errors on `input` or `prompt`.
/// Input closing before an answer arrives is an `UnexpectedEof` I/O error.
pub fn view_samples<S, R, W>(
    dataset: &Dataset,
    sink: &mut S,
    mut input: R,
    mut prompt: W,
) -> Result<usize>
where
    S: FigureSink + ?Sized,
    R: BufRead,
    W: Write,
{
    let mut shown = 0;
    let mut line = String::new();

    for (index, (pixels, &label)) in dataset
        .samples()
        .iter_rows()
        .zip(dataset.labels())
        .enumerate()
    {
        sink.show_sample(pixels, &sample_title(label))?;
        shown += 1;

        prompt.write_all(PROMPT.as_bytes())?;
        prompt.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            warn!(shown, "input closed while waiting for an answer");
            return Err(std::io::Error::from(ErrorKind::UnexpectedEof).into());
        }
        let answer = line.trim_end_matches(['\r', '\n']);
        if should_stop(answer) {
            debug!(index, "viewer stopped by user");
            break;
        }
    }

    Ok(shown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::error::VizError;
    use crate::render::MemoryFigures;
    use std::io::Cursor;

    fn run(dataset: &Dataset, answers: &str) -> (usize, MemoryFigures, String) {
        let mut sink = MemoryFigures::new();
        let mut out = Vec::new();
        let shown = view_samples(dataset, &mut sink, Cursor::new(answers), &mut out).unwrap();
        (shown, sink, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_should_stop() {
        assert!(should_stop("n"));
        assert!(should_stop("N"));
        assert!(should_stop("no thanks"));
        assert!(should_stop("Nope"));
        assert!(!should_stop(""));
        assert!(!should_stop("y"));
        assert!(!should_stop(" n"));
        assert!(!should_stop("yes, not now"));
    }

    #[test]
    fn test_stops_on_third_answer() {
        let ds = Dataset::synthetic(1, 1).filter_labels(&[0, 1, 2, 3, 4]);
        let (shown, sink, out) = run(&ds, "\n\nn\n\n\n");
        assert_eq!(shown, 3);
        assert_eq!(sink.sample_titles.len(), 3);
        assert_eq!(out.matches(PROMPT).count(), 3);
    }

    #[test]
    fn test_runs_through_all_samples() {
        let ds = Dataset::synthetic(1, 1);
        let answers = "y\n".repeat(ds.len());
        let (shown, _, _) = run(&ds, &answers);
        assert_eq!(shown, ds.len());
    }

    #[test]
    fn test_titles_name_labels_in_order() {
        let ds = Dataset::synthetic(2, 1);
        let (_, sink, _) = run(&ds, "\n\n\nN\n");
        assert_eq!(
            sink.sample_titles,
            vec!["Image of '0'", "Image of '1'", "Image of '2'", "Image of '3'"]
        );
    }

    #[test]
    fn test_crlf_answers() {
        let ds = Dataset::synthetic(3, 1);
        let (shown, _, _) = run(&ds, "\r\nN\r\n");
        assert_eq!(shown, 2);
    }

    #[test]
    fn test_end_of_input_is_an_error() {
        let ds = Dataset::synthetic(4, 1);
        let mut sink = MemoryFigures::new();
        let err = view_samples(&ds, &mut sink, Cursor::new("\n"), std::io::sink()).unwrap_err();
        assert!(matches!(err, VizError::Io(ref e) if e.kind() == ErrorKind::UnexpectedEof));
        assert_eq!(sink.sample_titles.len(), 2);
    }

    #[test]
    fn test_empty_input_fails_after_first_sample() {
        let ds = Dataset::synthetic(1, 1);
        let mut sink = MemoryFigures::new();
        let result = view_samples(&ds, &mut sink, Cursor::new(""), std::io::sink());
        assert!(result.is_err());
        assert_eq!(sink.sample_titles.len(), 1);
    }

    #[test]
    fn test_empty_dataset_shows_nothing() {
        let ds = Dataset::synthetic(5, 0);
        let (shown, sink, out) = run(&ds, "");
        assert_eq!(shown, 0);
        assert!(sink.sample_titles.is_empty());
        assert!(out.is_empty());
    }
}
