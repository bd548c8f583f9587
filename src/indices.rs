use stacked_errors::{bail, Result, StackableErr};

/// Delimiter for an inclusive 1-based range expression such as "2...4"
pub const RANGE_DELIMITER: &str = "...";

/// Parses the positional CLI arguments of a batch operation into zero-based
/// snapshot offsets.
///
/// A single argument containing [RANGE_DELIMITER] is an inclusive 1-based
/// range. Otherwise every argument is split on ',' and each token is parsed
/// as a 1-based position. Malformed tokens and the position 0 are errors.
///
///```
/// use dockpick::resolve_indices;
///
/// assert_eq!(resolve_indices(&["2...4".to_owned()]).unwrap(), vec![1, 2, 3]);
/// assert_eq!(resolve_indices(&["1,3,5".to_owned()]).unwrap(), vec![0, 2, 4]);
/// assert_eq!(
///     resolve_indices(&["7".to_owned(), "2".to_owned()]).unwrap(),
///     vec![6, 1]
/// );
/// ```
pub fn resolve_indices(args: &[String]) -> Result<Vec<usize>> {
    if args.is_empty() {
        bail!("missing container number (e.g. `3`, `1,3,5`, or `2...4`)")
    }
    if let [only] = args {
        if let Some((start, end)) = only.split_once(RANGE_DELIMITER) {
            let start = parse_position(start)?;
            let end = parse_position(end)?;
            // an inverted range selects nothing
            return Ok((start..=end).map(|position| position - 1).collect())
        }
    }
    let mut offsets = vec![];
    for arg in args {
        for token in arg.split(',') {
            offsets.push(parse_position(token)? - 1);
        }
    }
    Ok(offsets)
}

fn parse_position(token: &str) -> Result<usize> {
    let token = token.trim();
    let position: usize = token
        .parse()
        .stack_err_with(|| format!("could not parse container number from \"{token}\""))?;
    if position == 0 {
        bail!("container numbers are 1-based, \"0\" does not select anything")
    }
    Ok(position)
}

/// Maps offsets to the names they select in `snapshot`, preserving the order
/// of `offsets`. Offsets at or beyond the snapshot length are silently
/// dropped.
pub fn select_names(snapshot: &[String], offsets: &[usize]) -> Vec<String> {
    offsets
        .iter()
        .filter_map(|&offset| snapshot.get(offset).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn snapshot(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn range_expression() {
        assert_eq!(resolve_indices(&args(&["2...4"])).unwrap(), vec![1, 2, 3]);
        assert_eq!(resolve_indices(&args(&["1...1"])).unwrap(), vec![0]);
    }

    #[test]
    fn inverted_range_selects_nothing() {
        assert!(resolve_indices(&args(&["5...2"])).unwrap().is_empty());
    }

    #[test]
    fn explicit_lists() {
        assert_eq!(resolve_indices(&args(&["1,3,5"])).unwrap(), vec![0, 2, 4]);
        assert_eq!(
            resolve_indices(&args(&["4", "1,2", "4"])).unwrap(),
            vec![3, 0, 1, 3]
        );
    }

    #[test]
    fn missing_arguments_are_an_error() {
        assert!(resolve_indices(&[]).is_err());
    }

    #[test]
    fn malformed_tokens_are_an_error() {
        assert!(resolve_indices(&args(&["one"])).is_err());
        assert!(resolve_indices(&args(&["1,x,3"])).is_err());
        assert!(resolve_indices(&args(&["a...b"])).is_err());
    }

    #[test]
    fn zero_is_an_error() {
        assert!(resolve_indices(&args(&["0"])).is_err());
        assert!(resolve_indices(&args(&["0...3"])).is_err());
    }

    #[test]
    fn out_of_range_offsets_are_dropped() {
        let snap = snapshot(&["a", "b", "c"]);
        assert_eq!(select_names(&snap, &[0, 2, 7]), snapshot(&["a", "c"]));
        assert!(select_names(&snap, &[3, 100]).is_empty());
    }

    #[test]
    fn selection_preserves_order_and_duplicates() {
        let snap = snapshot(&["a", "b", "c"]);
        assert_eq!(
            select_names(&snap, &[2, 0, 2]),
            snapshot(&["c", "a", "c"])
        );
    }
}
