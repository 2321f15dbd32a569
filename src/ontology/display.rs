//! Rendering style shared by [`Identifier`](super::Identifier) and
//! [`Term`](super::Term) `Display` implementations.
//!
//! The style is process-wide and can be rotated to cycle through the
//! available templates. A one-shot override applies to the next value
//! rendered on the current thread and is cleared once used.

use std::{
    cell::Cell,
    sync::atomic::{AtomicU8, Ordering},
};

/// Template used when an identifier or term is formatted.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DisplayStyle {
    /// `prefix:suffix`, or the IRI when no prefix is known.
    #[default]
    Curie,
    /// Always the full IRI.
    Iri,
    /// `curie, label` for resolved terms, the curie otherwise.
    CurieLabel,
    /// `curie, label, validated` for terms.
    Full,
}

impl DisplayStyle {
    const ALL: [Self; 4] = [Self::Curie, Self::Iri, Self::CurieLabel, Self::Full];

    fn index(self) -> u8 {
        match self {
            Self::Curie => 0,
            Self::Iri => 1,
            Self::CurieLabel => 2,
            Self::Full => 3,
        }
    }

    fn from_index(index: u8) -> Self {
        Self::ALL[usize::from(index) % Self::ALL.len()]
    }

    /// Returns the template following `self` in rotation order.
    #[must_use]
    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }
}

static STYLE: AtomicU8 = AtomicU8::new(0);

thread_local! {
    static ONCE: Cell<Option<DisplayStyle>> = const { Cell::new(None) };
}

/// Returns the process-wide style.
#[must_use]
pub fn style() -> DisplayStyle {
    DisplayStyle::from_index(STYLE.load(Ordering::Relaxed))
}

/// Replaces the process-wide style.
pub fn set_style(style: DisplayStyle) {
    STYLE.store(style.index(), Ordering::Relaxed);
}

/// Advances the process-wide style to the next template and returns it.
pub fn rotate() -> DisplayStyle {
    let next = style().next();
    set_style(next);
    next
}

/// Uses `style` for the next value rendered on this thread only.
pub fn once(style: DisplayStyle) {
    ONCE.with(|slot| slot.set(Some(style)));
}

/// Consumes the one-shot override, falling back to the process-wide style.
pub(crate) fn take() -> DisplayStyle {
    ONCE.with(Cell::take).unwrap_or_else(style)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_cycles_through_every_style() {
        let mut current = DisplayStyle::Curie;
        let mut seen = vec![current];
        for _ in 0..3 {
            current = current.next();
            seen.push(current);
        }
        assert_eq!(seen, DisplayStyle::ALL.to_vec());
        assert_eq!(current.next(), DisplayStyle::Curie);
    }

    #[test]
    fn one_shot_override_is_consumed() {
        once(DisplayStyle::Full);
        assert_eq!(take(), DisplayStyle::Full);
        assert_eq!(take(), style());
    }
}
