use std::cmp::Ordering;

/// One run of a name split at digit boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Chunk<'a> {
    Text(String),
    // Digits with leading zeros stripped; compared by length then lexically.
    Number(&'a str),
}

fn chunks(name: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut in_digits = false;
    for (idx, ch) in name.char_indices() {
        let is_digit = ch.is_ascii_digit();
        if idx == 0 {
            in_digits = is_digit;
            if is_digit {
                // Names always begin with a (possibly empty) text run so text
                // and number positions line up between any two keys.
                out.push(Chunk::Text(String::new()));
            }
            continue;
        }
        if is_digit != in_digits {
            out.push(make_chunk(&name[start..idx], in_digits));
            start = idx;
            in_digits = is_digit;
        }
    }
    if !name.is_empty() {
        out.push(make_chunk(&name[start..], in_digits));
    }
    out
}

fn make_chunk(raw: &str, digits: bool) -> Chunk<'_> {
    if digits {
        let trimmed = raw.trim_start_matches('0');
        Chunk::Number(trimmed)
    } else {
        Chunk::Text(raw.to_lowercase())
    }
}

fn compare_chunk(a: &Chunk<'_>, b: &Chunk<'_>) -> Ordering {
    match (a, b) {
        (Chunk::Number(x), Chunk::Number(y)) => x.len().cmp(&y.len()).then_with(|| x.cmp(y)),
        (Chunk::Text(x), Chunk::Text(y)) => x.cmp(y),
        (Chunk::Number(_), Chunk::Text(_)) => Ordering::Less,
        (Chunk::Text(_), Chunk::Number(_)) => Ordering::Greater,
    }
}

/// Orders names so that embedded digit runs compare as numbers
/// ("img2.png" < "img10.png") and letters compare case-insensitively.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = chunks(a);
    let right = chunks(b);
    for (x, y) in left.iter().zip(right.iter()) {
        let ord = compare_chunk(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    left.len().cmp(&right.len())
}

/// Stable natural sort: names with equal keys keep their input order.
pub fn sort_naturally<T, F>(items: &mut [T], name: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by(|a, b| natural_cmp(name(a), name(b)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_runs_compare_numerically() {
        let mut names = vec!["img10.png", "img2.png", "img1.png"];
        sort_naturally(&mut names, |n| n);
        assert_eq!(names, vec!["img1.png", "img2.png", "img10.png"]);
    }

    #[test]
    fn text_compares_case_insensitively() {
        assert_eq!(natural_cmp("Scan3.png", "scan3.png"), Ordering::Equal);
        assert_eq!(natural_cmp("Beta1", "alpha2"), Ordering::Greater);
    }

    #[test]
    fn leading_zeros_do_not_change_value() {
        assert_eq!(natural_cmp("page007", "page7"), Ordering::Equal);
        assert_eq!(natural_cmp("page007", "page8"), Ordering::Less);
    }

    #[test]
    fn very_long_digit_runs_do_not_overflow() {
        let big = "x123456789012345678901234567890";
        let bigger = "x923456789012345678901234567890";
        assert_eq!(natural_cmp(big, bigger), Ordering::Less);
    }

    #[test]
    fn leading_digits_sort_before_letters() {
        let mut names = vec!["b.png", "10.png", "2.png", "a.png"];
        sort_naturally(&mut names, |n| n);
        assert_eq!(names, vec!["2.png", "10.png", "a.png", "b.png"]);
    }

    #[test]
    fn equal_keys_keep_input_order() {
        let mut names = vec![("IMG1", 0), ("img1", 1), ("img01", 2)];
        sort_naturally(&mut names, |n| n.0);
        assert_eq!(names.iter().map(|n| n.1).collect::<Vec<_>>(), vec![0, 1, 2]);
    }
}
