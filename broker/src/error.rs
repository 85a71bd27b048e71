//! Broker error types.

/// Errors that can occur while talking to the price, balance or swap services.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("http error: {0}")]
    Http(String),

    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("invalid mint address: {0}")]
    InvalidMint(String),

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("order did not return a transaction (router={router}). Reason: {reason}")]
    NoTransaction { router: String, reason: String },

    #[error("simulation error: {error}; logs: [{}]", .logs.join(" | "))]
    Simulation { error: String, logs: Vec<String> },

    #[error("execute failed: status={status}, code={code}, error={error}")]
    ExecuteFailed {
        status: String,
        code: i64,
        error: String,
    },

    #[error("swap amount must be positive")]
    ZeroAmount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulation_display_includes_logs() {
        let err = BrokerError::Simulation {
            error: "InstructionError(2, Custom(6001))".into(),
            logs: vec!["Program log: slippage".into(), "Program failed".into()],
        };
        let s = err.to_string();
        assert!(s.contains("Custom(6001)"));
        assert!(s.contains("Program log: slippage | Program failed"));
    }

    #[test]
    fn no_transaction_names_router() {
        let err = BrokerError::NoTransaction {
            router: "jupiterz".into(),
            reason: "Insufficient funds".into(),
        };
        assert_eq!(
            err.to_string(),
            "order did not return a transaction (router=jupiterz). Reason: Insufficient funds"
        );
    }
}
