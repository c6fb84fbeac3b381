use serde::{Deserialize, Serialize};

/// One seat as recorded by the escrow contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSeat {
    pub address: String,
    pub amount: u64,
    /// Hand id at which the seat asked to leave. `0` = no exit request.
    #[serde(default)]
    pub exit_hand: u64,
}

impl ChainSeat {
    pub fn new(address: impl Into<String>, amount: u64, exit_hand: u64) -> Self {
        Self {
            address: address.into(),
            amount,
            exit_hand,
        }
    }

    /// `true` when the player has an outstanding on-chain exit request.
    pub fn has_exit_request(&self) -> bool {
        self.exit_hand > 0
    }
}

/// Result of the contract's `getLineup` call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainLineup {
    pub last_hand_netted: u64,
    pub seats: Vec<ChainSeat>,
}

impl ChainLineup {
    pub fn any_exit_request(&self) -> bool {
        self.seats.iter().any(ChainSeat::has_exit_request)
    }
}

/// The three netting counters read at the start of every reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NettingStatus {
    pub last_hand_netted: u64,
    pub last_netting_request_hand_id: u64,
    /// Unix seconds.
    pub last_netting_request_time: i64,
}

impl NettingStatus {
    /// A netting request newer than the last netted hand is outstanding.
    pub fn is_pending(&self) -> bool {
        self.last_netting_request_hand_id > self.last_hand_netted
    }

    /// Seconds since the last netting request, as seen at `now`.
    pub fn request_age_secs(&self, now: i64) -> i64 {
        now - self.last_netting_request_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_only_when_request_is_ahead_of_netted() {
        let mut st = NettingStatus {
            last_hand_netted: 100,
            last_netting_request_hand_id: 100,
            last_netting_request_time: 0,
        };
        assert!(!st.is_pending());

        st.last_netting_request_hand_id = 105;
        assert!(st.is_pending());

        st.last_netting_request_hand_id = 99;
        assert!(!st.is_pending());
    }

    #[test]
    fn exit_hand_zero_is_not_an_exit_request() {
        let lineup = ChainLineup {
            last_hand_netted: 3,
            seats: vec![ChainSeat::new("0xaa", 100, 0), ChainSeat::new("0xbb", 50, 0)],
        };
        assert!(!lineup.any_exit_request());

        let lineup = ChainLineup {
            last_hand_netted: 3,
            seats: vec![ChainSeat::new("0xaa", 100, 0), ChainSeat::new("0xbb", 50, 4)],
        };
        assert!(lineup.any_exit_request());
    }

    #[test]
    fn missing_exit_hand_reads_as_no_request() {
        let seat: ChainSeat =
            serde_json::from_value(serde_json::json!({ "address": "0xaa", "amount": 10 })).unwrap();
        assert_eq!(seat.exit_hand, 0);
        assert!(!seat.has_exit_request());
    }
}
