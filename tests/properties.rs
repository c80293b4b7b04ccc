use chrono::{Local, TimeZone};
use proptest::prelude::*;
use regex::Regex;
use rfseek::filters::{DateCondition, SizeCondition, SizeSystem, matches_date, matches_size};
use rfseek::hash::{
    Murmur3x64_128, Murmur3x86_128, Murmur3x86_32, murmur3_x64_128, murmur3_x86_128,
    murmur3_x86_32,
};
use rfseek::scanner::{ScanLimits, scan};
use rfseek::CancelToken;
use std::io::Cursor;
use std::path::Path;

fn chunks(data: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    let mut points: Vec<usize> = cuts.iter().map(|c| c % (data.len() + 1)).collect();
    points.sort_unstable();
    let mut out = Vec::new();
    let mut start = 0;
    for p in points {
        out.push(data[start..p].to_vec());
        start = p;
    }
    out.push(data[start..].to_vec());
    out
}

proptest! {
    #[test]
    fn streaming_hashes_ignore_chunking(
        data in proptest::collection::vec(any::<u8>(), 0..300),
        cuts in proptest::collection::vec(any::<usize>(), 0..6),
        seed in any::<u32>(),
    ) {
        let parts = chunks(&data, &cuts);

        let mut h32 = Murmur3x86_32::new(seed);
        let mut h86 = Murmur3x86_128::new(seed);
        let mut h64 = Murmur3x64_128::new(seed);
        for part in &parts {
            h32.update(part);
            h86.update(part);
            h64.update(part);
        }

        prop_assert_eq!(h32.finish(), murmur3_x86_32(&data, seed));
        prop_assert_eq!(h86.finish(), murmur3_x86_128(&data, seed));
        prop_assert_eq!(h64.finish(), murmur3_x64_128(&data, seed));
    }

    #[test]
    fn size_conditions_are_complementary(
        size in 0u64..20_000,
        a in 0u32..20,
        b in 0u32..20,
        iec in any::<bool>(),
    ) {
        let system = if iec { SizeSystem::Iec } else { SizeSystem::Si };
        let unit = if iec { "KiB" } else { "KB" };
        let (v1, v2) = (f64::from(a), f64::from(b));

        let between = matches_size(size, system, SizeCondition::Between, v1, v2, unit, unit);
        let outside = matches_size(size, system, SizeCondition::NotBetween, v1, v2, unit, unit);
        prop_assert!(between != outside);

        let equal = matches_size(size, system, SizeCondition::Equals, v1, v2, unit, unit);
        let unequal = matches_size(size, system, SizeCondition::NotEquals, v1, v2, unit, unit);
        prop_assert!(equal != unequal);
    }

    #[test]
    fn date_conditions_are_complementary(
        ts in 0i64..2_000_000_000,
        a in 0i64..2_000_000_000,
        b in 0i64..2_000_000_000,
    ) {
        let at = |secs: i64| Local.timestamp_opt(secs, 0).unwrap();
        let (t, v1, v2) = (at(ts), at(a), at(b));

        let between = matches_date(t, DateCondition::Between, v1, v2);
        let outside = matches_date(t, DateCondition::NotBetween, v1, v2);
        prop_assert!(between != outside);

        let before = matches_date(t, DateCondition::Before, v1, v2);
        let after = matches_date(t, DateCondition::After, v1, v2);
        let equal = matches_date(t, DateCondition::Equals, v1, v2);
        prop_assert_eq!(u8::from(before) + u8::from(after) + u8::from(equal), 1);
    }

    #[test]
    fn scanner_agrees_with_whole_content_search(
        lines in proptest::collection::vec("[abc ]{0,24}", 0..40),
    ) {
        let content = lines.join("\n");
        let pattern = Regex::new("ab+c?").unwrap();

        let found = scan(
            Cursor::new(content.as_bytes()),
            &ScanLimits::default(),
            &pattern,
            &CancelToken::new(),
            Path::new("generated"),
        );

        prop_assert_eq!(found.occurrences, pattern.find_iter(&content).count());
        let expected_lines: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| pattern.is_match(line))
            .map(|(i, _)| i + 1)
            .collect();
        prop_assert_eq!(found.lines.into_iter().collect::<Vec<_>>(), expected_lines);
    }
}
