//! Counter formatting shared between heading-table numbering cells and list
//! prefixes.
//!
//! Given a template string and a 1-based counter, substitutes the counter
//! into whichever pattern the template exhibits: a Roman numeral, an Arabic
//! digit run, or a Korean syllable from a fixed 14-character cycle. A
//! template matching none of these comes back unchanged.

const KOREAN_SYLLABLES: &[char] = &[
    '가', '나', '다', '라', '마', '바', '사', '아', '자', '차', '카', '타', '파', '하',
];

const ROMAN_TABLE: &[(i64, &str)] = &[
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

fn to_roman_upper(mut n: i64) -> String {
    let mut out = String::new();
    for &(value, symbol) in ROMAN_TABLE {
        while n >= value {
            out.push_str(symbol);
            n -= value;
        }
    }
    out
}

fn roman_numerals_upper(max: i64) -> Vec<String> {
    (1..=max).map(to_roman_upper).collect()
}

/// Formats `counter` (1-based) according to the pattern recognized in
/// `template`, stripped of surrounding whitespace for pattern matching but
/// substituted back in context (the non-pattern characters of `template`
/// are preserved; only the matched run is replaced).
pub fn format_counter(template: &str, counter: u32) -> String {
    let stripped = template.trim();
    if stripped.is_empty() || counter == 0 {
        return template.to_string();
    }

    let romans = roman_numerals_upper(20);
    if romans.iter().any(|r| r == stripped) {
        if (counter as usize) <= 20 {
            return to_roman_upper(counter as i64);
        }
        return counter.to_string();
    }
    let lower_romans: Vec<String> = romans.iter().map(|r| r.to_lowercase()).collect();
    if lower_romans.iter().any(|r| r == stripped) {
        if (counter as usize) <= 20 {
            return to_roman_upper(counter as i64).to_lowercase();
        }
        return counter.to_string();
    }

    if let Some((start, end)) = first_digit_run(template) {
        let mut out = String::with_capacity(template.len());
        out.push_str(&template[..start]);
        out.push_str(&counter.to_string());
        out.push_str(&template[end..]);
        return out;
    }

    if let Some((start, end, ch)) = first_korean_syllable(template) {
        if let Some(pos) = KOREAN_SYLLABLES.iter().position(|&c| c == ch) {
            let _ = pos;
            let idx = (counter - 1) as usize;
            if idx < KOREAN_SYLLABLES.len() {
                let mut out = String::with_capacity(template.len());
                out.push_str(&template[..start]);
                out.push(KOREAN_SYLLABLES[idx]);
                out.push_str(&template[end..]);
                return out;
            }
        }
    }

    template.to_string()
}

fn first_digit_run(s: &str) -> Option<(usize, usize)> {
    let mut start = None;
    for (i, c) in s.char_indices() {
        if c.is_ascii_digit() {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(st) = start {
            return Some((st, i));
        }
    }
    start.map(|st| (st, s.len()))
}

fn first_korean_syllable(s: &str) -> Option<(usize, usize, char)> {
    for (i, c) in s.char_indices() {
        if KOREAN_SYLLABLES.contains(&c) {
            return Some((i, i + c.len_utf8(), c));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roman_upper_and_lower() {
        assert_eq!(format_counter("I.", 1), "I.");
        assert_eq!(format_counter("I.", 4), "IV.");
        assert_eq!(format_counter("i.", 4), "iv.");
        assert_eq!(format_counter("i.", 9), "ix.");
    }

    #[test]
    fn arabic_digits() {
        assert_eq!(format_counter("1.", 1), "1.");
        assert_eq!(format_counter("1.", 12), "12.");
    }

    #[test]
    fn korean_syllables() {
        assert_eq!(format_counter("가.", 1), "가.");
        assert_eq!(format_counter("가.", 3), "다.");
    }

    #[test]
    fn unrecognized_pattern_is_unchanged() {
        assert_eq!(format_counter("Appendix", 5), "Appendix");
    }

    #[test]
    fn round_trip_over_twenty_counters() {
        for k in 1..=20u32 {
            let upper = format_counter("I.", k);
            assert!(upper.ends_with('.'));
            let lower = format_counter("i.", k);
            assert_eq!(lower, upper.to_lowercase());
            assert_eq!(format_counter("1.", k), format!("{k}."));
        }
        // The Korean cycle only has 14 syllables; beyond that the template
        // is returned unchanged rather than panicking or wrapping.
        for k in 1..=14u32 {
            assert_eq!(
                format_counter("가.", k),
                format!("{}.", KOREAN_SYLLABLES[(k - 1) as usize])
            );
        }
        assert_eq!(format_counter("가.", 15), "가.");
    }

    #[test]
    fn roman_falls_back_to_plain_digits_past_twenty() {
        assert_eq!(format_counter("I.", 21), "21");
        assert_eq!(format_counter("i.", 21), "21");
    }
}
