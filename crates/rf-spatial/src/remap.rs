//! Output channel remap table.
//!
//! Hand-rolled two-column CSV scanner — the format is trivial enough that
//! pulling in a CSV crate just for this isn't worth a new dependency.

use std::collections::HashSet;

use log::warn;

/// One `(layout speaker index, device channel index)` routing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapEntry {
    pub layout_index: usize,
    pub device_index: usize,
}

#[derive(Debug, Clone)]
pub struct ChannelRemap {
    pub entries: Vec<RemapEntry>,
    /// True when `entries` is exactly `{(0,0), (1,1), ..., (N-1,N-1)}`,
    /// letting the caller take a straight-copy fast path.
    pub is_identity: bool,
}

/// Parse a remap CSV: header line `layout,device`, `#`-comments and blank
/// lines ignored, extra trailing columns ignored. Entries referencing an
/// out-of-range index are dropped with a one-time warning.
pub fn parse(csv: &str, num_layout_channels: usize, num_device_channels: usize) -> ChannelRemap {
    let mut entries = Vec::new();
    let mut warned_out_of_range = false;

    for (line_no, raw_line) in csv.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line_no == 0 && line.to_lowercase().starts_with("layout") {
            continue;
        }

        let mut cols = line.split(',').map(str::trim);
        let layout_str = cols.next();
        let device_str = cols.next();

        let (Some(layout_str), Some(device_str)) = (layout_str, device_str) else {
            continue;
        };

        let (Ok(layout_index), Ok(device_index)) =
            (layout_str.parse::<usize>(), device_str.parse::<usize>())
        else {
            continue;
        };

        if layout_index >= num_layout_channels || device_index >= num_device_channels {
            if !warned_out_of_range {
                warn!(
                    "remap: dropping out-of-range entry ({layout_index}, {device_index})"
                );
                warned_out_of_range = true;
            }
            continue;
        }

        entries.push(RemapEntry { layout_index, device_index });
    }

    let is_identity = is_identity_mapping(&entries, num_layout_channels);

    ChannelRemap { entries, is_identity }
}

fn is_identity_mapping(entries: &[RemapEntry], num_layout_channels: usize) -> bool {
    if entries.len() != num_layout_channels {
        return false;
    }
    let set: HashSet<(usize, usize)> = entries.iter().map(|e| (e.layout_index, e.device_index)).collect();
    (0..num_layout_channels).all(|i| set.contains(&(i, i)))
}

/// An identity remap for `n` channels, used as the default when no CSV is
/// supplied.
pub fn identity(n: usize) -> ChannelRemap {
    ChannelRemap {
        entries: (0..n).map(|i| RemapEntry { layout_index: i, device_index: i }).collect(),
        is_identity: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_rows_and_skips_header_and_comments() {
        let csv = "layout,device\n0,2\n# comment\n\n1,3\n";
        let remap = parse(csv, 4, 4);
        assert_eq!(remap.entries.len(), 2);
        assert_eq!(remap.entries[0], RemapEntry { layout_index: 0, device_index: 2 });
    }

    #[test]
    fn out_of_range_entries_are_dropped() {
        let csv = "layout,device\n0,0\n99,0\n";
        let remap = parse(csv, 2, 2);
        assert_eq!(remap.entries.len(), 1);
    }

    #[test]
    fn detects_identity_mapping() {
        let csv = "layout,device\n0,0\n1,1\n2,2\n";
        let remap = parse(csv, 3, 3);
        assert!(remap.is_identity);
    }

    #[test]
    fn non_identity_permutation_is_not_identity() {
        let csv = "layout,device\n0,1\n1,0\n";
        let remap = parse(csv, 2, 2);
        assert!(!remap.is_identity);
    }

    #[test]
    fn trailing_columns_are_ignored() {
        let csv = "layout,device\n0,1,ignored,extra\n";
        let remap = parse(csv, 2, 2);
        assert_eq!(remap.entries[0], RemapEntry { layout_index: 0, device_index: 1 });
    }

    #[test]
    fn many_to_one_entries_are_valid() {
        let csv = "layout,device\n0,0\n1,0\n";
        let remap = parse(csv, 2, 1);
        assert_eq!(remap.entries.len(), 2);
    }

    #[test]
    fn default_identity_helper_matches_parsed_identity() {
        let remap = identity(4);
        assert!(remap.is_identity);
        assert_eq!(remap.entries.len(), 4);
    }
}
