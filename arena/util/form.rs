/// Decodes a percent-encoded string (`%XX`) and converts `+` to space.
/// Invalid escapes are kept literally; invalid UTF-8 is replaced.
pub fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let hi = (bytes[i + 1] as char).to_digit(16);
                let lo = (bytes[i + 2] as char).to_digit(16);
                match (hi, lo) {
                    (Some(h), Some(l)) => {
                        out.push(((h << 4) | l) as u8);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parses `key=value&key2=value2` into a `Vec` of `(key, value)` pairs.
pub fn parse_form(body: &str) -> Vec<(String, String)> {
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut it = pair.splitn(2, '=');
            let k = it.next()?;
            let v = it.next().unwrap_or("");
            Some((url_decode(k), url_decode(v)))
        })
        .collect()
}

/// Looks up a key in parsed form pairs, returning the value if found.
pub fn form_get<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

/// Parses `key` from `query` as a number; `Err` carries a client message.
pub fn query_number<T: std::str::FromStr>(query: &str, key: &str) -> Result<Option<T>, String> {
    let pairs = parse_form(query);
    match form_get(&pairs, key) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| format!("{} must be a non-negative integer, got {:?}", key, raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_escapes_and_plus() {
        assert_eq!(url_decode("a+b%2Fc"), "a b/c");
        assert_eq!(url_decode("100%"), "100%");
        assert_eq!(url_decode("%zz"), "%zz");
        assert_eq!(url_decode("caf%C3%A9"), "café");
    }

    #[test]
    fn parses_query_pairs() {
        let pairs = parse_form("json=models%2Fa.json&weights=&flag");
        assert_eq!(form_get(&pairs, "json"), Some("models/a.json"));
        assert_eq!(form_get(&pairs, "weights"), Some(""));
        assert_eq!(form_get(&pairs, "flag"), Some(""));
        assert_eq!(form_get(&pairs, "missing"), None);
    }

    #[test]
    fn numbers_from_query() {
        assert_eq!(query_number::<usize>("epochs=12", "epochs"), Ok(Some(12)));
        assert_eq!(query_number::<usize>("", "epochs"), Ok(None));
        assert!(query_number::<usize>("epochs=-1", "epochs").is_err());
    }
}
