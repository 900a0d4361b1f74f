// Copyright 2024 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Half-open interval `[start, end)` over the 128-bit stream id key space.
/// A `None` bound is unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRange {
    pub start: Option<Uuid>,
    pub end: Option<Uuid>,
}

impl StreamRange {
    pub fn new(start: Option<Uuid>, end: Option<Uuid>) -> Self {
        Self { start, end }
    }

    /// Full key space.
    pub fn full() -> Self {
        Self { start: None, end: None }
    }

    pub fn contains(&self, stream_id: &Uuid) -> bool {
        let after_start = self.start.as_ref().map_or(true, |start| stream_id >= start);
        let before_end = self.end.as_ref().map_or(true, |end| stream_id < end);
        after_start && before_end
    }
}

/// Splits the stream id space into `n_ranges` approximately equal contiguous
/// intervals, splitting on the top 32 bits of the uuid.
///
/// The returned ranges are sorted ascending, pairwise disjoint, and cover
/// the whole key space: the first is unbounded below, the last unbounded
/// above. Pure function, safe to call repeatedly and in parallel.
pub fn create_stream_ranges(n_ranges: u32) -> Result<Vec<StreamRange>> {
    if n_ranges == 0 {
        return Err(Error::InvalidRangeCount(n_ranges));
    }

    let step = u32::MAX / n_ranges;

    let mut boundaries = Vec::with_capacity(n_ranges as usize - 1);
    for i in 1..n_ranges {
        boundaries.push(uuid_from_high_bits(step * i));
    }

    let mut ranges = Vec::with_capacity(n_ranges as usize);
    let mut start = None;
    for boundary in boundaries {
        ranges.push(StreamRange::new(start, Some(boundary)));
        start = Some(boundary);
    }
    ranges.push(StreamRange::new(start, None));

    Ok(ranges)
}

fn uuid_from_high_bits(high: u32) -> Uuid {
    Uuid::from_u128((high as u128) << 96)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ranges_rejected() {
        assert!(matches!(create_stream_ranges(0), Err(Error::InvalidRangeCount(0))));
    }

    #[test]
    fn test_single_range_covers_everything() {
        let ranges = create_stream_ranges(1).unwrap();
        assert_eq!(ranges, vec![StreamRange::full()]);
    }

    #[test]
    fn test_ranges_are_sorted_disjoint_and_cover_key_space() {
        for n in [1u32, 2, 3, 7, 16, 100] {
            let ranges = create_stream_ranges(n).unwrap();
            assert_eq!(ranges.len(), n as usize);

            assert!(ranges.first().unwrap().start.is_none(), "first range unbounded below");
            assert!(ranges.last().unwrap().end.is_none(), "last range unbounded above");

            // Each range's end is the next range's start, so there are no
            // gaps and no overlaps, and boundaries are strictly ascending.
            for pair in ranges.windows(2) {
                let end = pair[0].end.expect("interior range has an end");
                let start = pair[1].start.expect("interior range has a start");
                assert_eq!(end, start);
            }
            let boundaries: Vec<Uuid> = ranges.iter().filter_map(|r| r.end).collect();
            for pair in boundaries.windows(2) {
                assert!(pair[0] < pair[1], "boundaries ascend for n={n}");
            }
        }
    }

    #[test]
    fn test_every_stream_id_lands_in_exactly_one_range() {
        let ranges = create_stream_ranges(5).unwrap();
        let probes = [
            Uuid::nil(),
            Uuid::from_u128(1),
            Uuid::from_u128(u128::MAX / 3),
            Uuid::from_u128(u128::MAX / 2),
            Uuid::from_u128(u128::MAX - 1),
            Uuid::from_u128(u128::MAX),
        ];
        for probe in probes {
            let hits = ranges.iter().filter(|r| r.contains(&probe)).count();
            assert_eq!(hits, 1, "stream id {probe} must land in exactly one range");
        }
    }
}
