//! Context-scoped key encoding.
//!
//! A context-qualified message is stored under `context \x04 message`.
//! After a lookup, a result that still contains the separator byte is an
//! unresolved key echoed back, not a translation.
//!
//! Known ambiguity, kept deliberately: a genuine translation that
//! legitimately contains byte 0x04 is also flagged as unresolved and
//! the caller falls back to the untranslated message.

/// Separator between a context tag and the message it scopes.
pub const CONTEXT_SEPARATOR: char = '\u{4}';

/// Build the catalog key for a context-scoped message.
///
/// For context plurals this is applied to the singular only; the plural
/// half of the key stays unqualified.
pub fn encode(context: &str, message: &str) -> String {
    let mut key = String::with_capacity(context.len() + 1 + message.len());
    key.push_str(context);
    key.push(CONTEXT_SEPARATOR);
    key.push_str(message);
    key
}

/// True if a lookup result is an echoed-back context key rather than a
/// real translation.
pub fn is_unresolved(result: &str) -> bool {
    result.contains(CONTEXT_SEPARATOR)
}
