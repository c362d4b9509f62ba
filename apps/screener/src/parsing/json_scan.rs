//! Locating a JSON object inside free-form model output.

use serde_json::{Map, Value};

/// Returns the first well-formed JSON object in `text`, skipping prose and
/// code fences around it. An object cut off by the end of the text is closed
/// (open strings, arrays and objects) rather than skipped, so a truncated
/// outer object is never mistaken for one of its complete children.
pub fn first_object(text: &str) -> Option<Map<String, Value>> {
    for (start, _) in text.match_indices('{') {
        let candidate = &text[start..];
        let mut stream = serde_json::Deserializer::from_str(candidate).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(map))) => return Some(map),
            Some(Err(e)) if e.is_eof() => return repair(candidate),
            _ => continue,
        }
    }
    None
}

fn repair(candidate: &str) -> Option<Map<String, Value>> {
    let repaired = close_truncated(candidate)?;
    match serde_json::from_str::<Value>(&repaired) {
        // A repair that salvaged no member is a stray brace, not a record.
        Ok(Value::Object(map)) if !map.is_empty() => Some(map),
        _ => None,
    }
}

/// What the innermost open container accepts next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Key,
    Colon,
    Value,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Object(Expect),
    Array(Expect),
}

impl Frame {
    fn expects_value(self) -> bool {
        matches!(self, Frame::Object(Expect::Value) | Frame::Array(Expect::Value))
    }

    fn closer(self) -> char {
        match self {
            Frame::Object(_) => '}',
            Frame::Array(_) => ']',
        }
    }
}

fn set_top(stack: &mut [Frame], expect: Expect) {
    if let Some(top) = stack.last_mut() {
        *top = match top {
            Frame::Object(_) => Frame::Object(expect),
            Frame::Array(_) => Frame::Array(expect),
        };
    }
}

fn close_all(mut out: String, stack: &[Frame]) -> String {
    for frame in stack.iter().rev() {
        out.push(frame.closer());
    }
    out
}

/// Closes a JSON object cut off by the end of the text.
///
/// Tracks the last position where every open member was complete. A cut
/// inside a string value keeps the partial string; a cut after `:` yields
/// `null`; a cut inside a key or a bare literal falls back to the last
/// complete member. Returns `None` when the input is not a truncated object
/// (balanced, or invalid before the cut).
fn close_truncated(s: &str) -> Option<String> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut safe: Option<(usize, Vec<Frame>)> = None;
    let mut dangling = false;
    let mut chars = s.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }
        let top = stack.last().copied();

        match c {
            '{' | '[' => {
                if top.is_some_and(|t| !t.expects_value()) || (top.is_none() && i > 0) {
                    return None;
                }
                stack.push(if c == '{' {
                    Frame::Object(Expect::Key)
                } else {
                    Frame::Array(Expect::Value)
                });
                safe = Some((i + 1, stack.clone()));
            }
            '}' | ']' => {
                match (c, stack.pop()?) {
                    ('}', Frame::Object(Expect::Key | Expect::Comma))
                    | (']', Frame::Array(Expect::Value | Expect::Comma)) => {}
                    _ => return None,
                }
                if stack.is_empty() {
                    return None;
                }
                set_top(&mut stack, Expect::Comma);
                safe = Some((i + 1, stack.clone()));
            }
            '"' => {
                let is_key = top == Some(Frame::Object(Expect::Key));
                if !is_key && !top.is_some_and(Frame::expects_value) {
                    return None;
                }

                let mut escaped = false;
                let mut closed_at = None;
                for (j, d) in chars.by_ref() {
                    if escaped {
                        escaped = false;
                    } else if d == '\\' {
                        escaped = true;
                    } else if d == '"' {
                        closed_at = Some(j);
                        break;
                    }
                }

                match closed_at {
                    Some(_) if is_key => set_top(&mut stack, Expect::Colon),
                    Some(j) => {
                        set_top(&mut stack, Expect::Comma);
                        safe = Some((j + 1, stack.clone()));
                    }
                    None if is_key => {
                        dangling = true;
                        break;
                    }
                    None => {
                        let mut out = s.to_string();
                        if escaped {
                            out.pop();
                        }
                        out.push('"');
                        set_top(&mut stack, Expect::Comma);
                        return Some(close_all(out, &stack));
                    }
                }
            }
            ':' => {
                if top != Some(Frame::Object(Expect::Colon)) {
                    return None;
                }
                set_top(&mut stack, Expect::Value);
            }
            ',' => match top {
                Some(Frame::Object(Expect::Comma)) => set_top(&mut stack, Expect::Key),
                Some(Frame::Array(Expect::Comma)) => set_top(&mut stack, Expect::Value),
                _ => return None,
            },
            _ => {
                // Number or true/false/null.
                if !top.is_some_and(Frame::expects_value) {
                    return None;
                }
                let mut end = i + c.len_utf8();
                let mut terminated = false;
                while let Some(&(j, d)) = chars.peek() {
                    if d.is_whitespace() || matches!(d, ',' | '}' | ']') {
                        terminated = true;
                        break;
                    }
                    end = j + d.len_utf8();
                    chars.next();
                }
                if !terminated {
                    dangling = true;
                    break;
                }
                if serde_json::from_str::<Value>(&s[i..end]).is_err() {
                    return None;
                }
                set_top(&mut stack, Expect::Comma);
                safe = Some((end, stack.clone()));
            }
        }
    }

    if stack.is_empty() {
        return None;
    }

    if !dangling && stack.last() == Some(&Frame::Object(Expect::Value)) {
        let mut out = s.trim_end().to_string();
        out.push_str(" null");
        set_top(&mut stack, Expect::Comma);
        return Some(close_all(out, &stack));
    }

    let (len, stack) = safe?;
    Some(close_all(s[..len].to_string(), &stack))
}
