// Stream module - valid/ready handshake primitives
//
// Every stage boundary in the scan-out pipeline is a stream. A producer offers
// an element (valid), a consumer signals whether it can take one (ready), and a
// transfer happens only on steps where both hold.
//
// Offered elements are modelled as `Option<StreamElement<T>>`: `Some` means the
// producer asserts valid this step. Ready is a plain `bool` computed by the
// consumer from its pre-step registers.

/// One unit flowing between two pipeline stages
///
/// Carries the payload plus the `last` marker that closes a logical unit
/// (final pixel of a frame, final word of an address sequence).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamElement<T> {
    /// Payload carried by this element
    pub payload: T,

    /// Marks the final element of a logical unit
    pub last: bool,
}

impl<T> StreamElement<T> {
    /// Create an element that does not close a logical unit
    pub fn new(payload: T) -> Self {
        StreamElement {
            payload,
            last: false,
        }
    }

    /// Create an element with an explicit `last` marker
    pub fn with_last(payload: T, last: bool) -> Self {
        StreamElement { payload, last }
    }

    /// Map the payload, keeping the `last` marker
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> StreamElement<U> {
        StreamElement {
            payload: f(self.payload),
            last: self.last,
        }
    }
}

/// Returns `true` when a transfer happens on this step
///
/// # Arguments
///
/// * `offered` - The producer's offer for this step (valid when `Some`)
/// * `ready` - The consumer's ready signal for this step
#[inline]
pub fn fires<T>(offered: &Option<T>, ready: bool) -> bool {
    offered.is_some() && ready
}

/// Take the offered element if the handshake completes on this step
///
/// Returns `None` both when nothing is offered and when the consumer stalls.
#[inline]
pub fn transfer<T: Clone>(offered: &Option<T>, ready: bool) -> Option<T> {
    if ready {
        offered.clone()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_requires_valid_and_ready() {
        let offered = Some(StreamElement::new(7u8));
        assert!(fires(&offered, true));
        assert!(!fires(&offered, false));
        assert!(!fires::<StreamElement<u8>>(&None, true));
    }

    #[test]
    fn test_transfer_respects_ready() {
        let offered = Some(StreamElement::with_last(3u16, true));
        assert_eq!(transfer(&offered, false), None);
        assert_eq!(transfer(&offered, true), offered);
    }

    #[test]
    fn test_map_keeps_last() {
        let element = StreamElement::with_last(2u8, true).map(|v| v as u32 * 10);
        assert_eq!(element.payload, 20);
        assert!(element.last);
    }
}
