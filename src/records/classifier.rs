//! Splits a raw log into data, status and position lines.
//!
//! Classification is by substring: a line containing `D:` is a data line, otherwise a
//! line containing `S:` is a status line, otherwise a line containing `$` is a position
//! line. Anything else (boot banners, blank lines, operator notes) is dropped.

use tracing::debug;

use super::{ClassifiedLine, RawLine, RecordClass};

/// Marker priority. The first marker found in a line decides its class.
const PRIORITY: [RecordClass; 3] = [RecordClass::Data, RecordClass::Status, RecordClass::Position];

/// Lines of a raw log grouped by record class, each group in original order.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedLines {
    /// Data lines.
    pub data: Vec<ClassifiedLine>,
    /// Status lines.
    pub status: Vec<ClassifiedLine>,
    /// Position lines.
    pub position: Vec<ClassifiedLine>,
    /// Number of lines that matched no marker.
    pub unmatched: usize,
}

impl ClassifiedLines {
    /// Total number of classified lines.
    pub fn len(&self) -> usize {
        self.data.len() + self.status.len() + self.position.len()
    }

    /// Whether no line was classified.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Returns the class of a single line, if it carries any marker.
pub fn class_of(text: &str) -> Option<RecordClass> {
    PRIORITY
        .into_iter()
        .find(|class| text.contains(class.marker()))
}

/// Classifies raw lines, preserving each line's original index.
pub fn classify(lines: &[RawLine]) -> ClassifiedLines {
    let mut out = ClassifiedLines::default();

    for line in lines {
        let text = line.text.trim();
        let Some(class) = class_of(text) else {
            out.unmatched += 1;
            continue;
        };

        let classified = ClassifiedLine {
            index: line.index,
            class,
            text: text.to_string(),
        };
        match class {
            RecordClass::Data => out.data.push(classified),
            RecordClass::Status => out.status.push(classified),
            RecordClass::Position => out.position.push(classified),
        }
    }

    debug!(
        data = out.data.len(),
        status = out.status.len(),
        position = out.position.len(),
        unmatched = out.unmatched,
        "Classified raw lines"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_by_marker() {
        let lines = RawLine::enumerate([
            "  D:1,2,3  ",
            "S:12,30,0,1,5,2023",
            "$GPGGA,123519",
            "LECS boot v2",
        ]);
        let out = classify(&lines);

        assert_eq!(out.data.len(), 1);
        assert_eq!(out.data[0].index, 0);
        assert_eq!(out.data[0].text, "D:1,2,3");
        assert_eq!(out.status[0].index, 1);
        assert_eq!(out.position[0].index, 2);
        assert_eq!(out.unmatched, 1);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_data_marker_wins_over_status_and_position() {
        assert_eq!(class_of("$S:D:1"), Some(RecordClass::Data));
        assert_eq!(class_of("$S:1"), Some(RecordClass::Status));
        assert_eq!(class_of("$GPRMC"), Some(RecordClass::Position));
        assert_eq!(class_of("d:lowercase"), None);
    }

    #[test]
    fn test_preserves_order_within_each_class() {
        let lines = vec![
            RawLine::new(10, "D:a"),
            RawLine::new(11, "S:b"),
            RawLine::new(12, "D:c"),
            RawLine::new(13, "D:d"),
        ];
        let out = classify(&lines);
        let indices: Vec<usize> = out.data.iter().map(|l| l.index).collect();
        assert_eq!(indices, vec![10, 12, 13]);
    }

    #[test]
    fn test_payload_splits_at_first_marker() {
        let line = ClassifiedLine {
            index: 0,
            class: RecordClass::Data,
            text: "123 D:1,2,D:3".to_string(),
        };
        assert_eq!(line.payload(), "1,2,D:3");
    }
}
