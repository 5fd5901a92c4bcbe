//! Stock arithmetic for the ledger engine.
//!
//! The movement type and reason category decide how a quantity applies to a
//! stock level. That decision is made exactly once, by classifying a request
//! into a closed [`StockEffect`]; the arithmetic itself has no string or
//! category dispatch left in it.

use kardex_core::{DomainError, DomainResult};

use crate::movement::{InventoryMovement, MovementRequest, MovementType, ReasonCategory};

/// How an accepted movement changes a stock level.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StockEffect {
    /// Stock enters the store (`IN`).
    Inbound { quantity: i64 },
    /// Stock leaves the store (`OUT`, and `TRANSFER` which is outbound-only).
    Outbound { quantity: i64 },
    /// A counted level replaces the current one (`ADJUSTMENT` with a
    /// counting category).
    SetExact { new_level: i64 },
    /// A relative correction on top of the current level (any other
    /// `ADJUSTMENT`).
    AddDelta { quantity: i64 },
}

impl StockEffect {
    /// Decide the effect of a request. Non-positive quantities are rejected
    /// here, before any state is touched.
    pub fn classify(
        movement_type: MovementType,
        reason_category: Option<ReasonCategory>,
        quantity: i64,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::invalid_argument(format!(
                "quantity must be positive, got {quantity}"
            )));
        }
        Ok(match movement_type {
            MovementType::In => StockEffect::Inbound { quantity },
            MovementType::Out | MovementType::Transfer => StockEffect::Outbound { quantity },
            MovementType::Adjustment => {
                if reason_category.is_some_and(|c| c.is_absolute_count()) {
                    StockEffect::SetExact { new_level: quantity }
                } else {
                    StockEffect::AddDelta { quantity }
                }
            }
        })
    }

    /// Apply the effect to a stock level, yielding the new level.
    ///
    /// Outbound effects that would drive the level below zero fail with
    /// `InsufficientStock` and leave nothing to roll back.
    pub fn apply(self, stock_before: i64) -> DomainResult<i64> {
        match self {
            StockEffect::Inbound { quantity } | StockEffect::AddDelta { quantity } => stock_before
                .checked_add(quantity)
                .ok_or_else(|| DomainError::validation("stock level overflow")),
            StockEffect::Outbound { quantity } => {
                let stock_after = stock_before - quantity;
                if stock_after < 0 {
                    return Err(DomainError::insufficient_stock(stock_before, quantity));
                }
                Ok(stock_after)
            }
            StockEffect::SetExact { new_level } => Ok(new_level),
        }
    }
}

impl MovementRequest {
    /// Classify this request into its stock effect.
    pub fn effect(&self) -> DomainResult<StockEffect> {
        StockEffect::classify(self.movement_type, self.reason_category, self.quantity)
    }
}

/// Re-derive a stock level by replaying a full movement history in order.
///
/// Every record carries its own before/after snapshot, so the replayed level
/// is the running sum of the deltas. The caller is responsible for passing
/// the complete history of one product, oldest first.
pub fn replay_stock(movements: &[InventoryMovement]) -> i64 {
    movements.iter().map(InventoryMovement::delta).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kardex_core::ProductId;

    fn request(
        movement_type: MovementType,
        reason_category: Option<ReasonCategory>,
        quantity: i64,
    ) -> MovementRequest {
        MovementRequest {
            product_id: ProductId::new(),
            movement_type,
            quantity,
            reason: "test".to_string(),
            reason_category,
            batch_id: None,
            user_id: None,
            reference_document: None,
            comments: None,
        }
    }

    #[test]
    fn in_movements_are_inbound() {
        let effect = request(MovementType::In, None, 5).effect().unwrap();
        assert_eq!(effect, StockEffect::Inbound { quantity: 5 });
        assert_eq!(effect.apply(10).unwrap(), 15);
    }

    #[test]
    fn out_and_transfer_are_outbound() {
        for movement_type in [MovementType::Out, MovementType::Transfer] {
            let effect = request(movement_type, None, 4).effect().unwrap();
            assert_eq!(effect, StockEffect::Outbound { quantity: 4 });
            assert_eq!(effect.apply(10).unwrap(), 6);
        }
    }

    #[test]
    fn counting_adjustments_set_the_exact_level() {
        for category in [ReasonCategory::Correction, ReasonCategory::InventoryCount] {
            let effect = request(MovementType::Adjustment, Some(category), 42)
                .effect()
                .unwrap();
            assert_eq!(effect, StockEffect::SetExact { new_level: 42 });
            // Prior level is irrelevant for a counted correction.
            assert_eq!(effect.apply(7).unwrap(), 42);
            assert_eq!(effect.apply(100).unwrap(), 42);
        }
    }

    #[test]
    fn other_adjustments_add_a_delta() {
        let effect = request(MovementType::Adjustment, Some(ReasonCategory::Damage), 3)
            .effect()
            .unwrap();
        assert_eq!(effect, StockEffect::AddDelta { quantity: 3 });
        assert_eq!(effect.apply(10).unwrap(), 13);
    }

    #[test]
    fn uncategorized_adjustments_add_a_delta() {
        let effect = request(MovementType::Adjustment, None, 2).effect().unwrap();
        assert_eq!(effect, StockEffect::AddDelta { quantity: 2 });
    }

    #[test]
    fn non_positive_quantities_are_rejected_before_classification() {
        for quantity in [0, -1, -50] {
            let err = request(MovementType::In, None, quantity).effect().unwrap_err();
            match err {
                DomainError::InvalidArgument(_) => {}
                _ => panic!("Expected InvalidArgument error for quantity {quantity}"),
            }
        }
    }

    #[test]
    fn outbound_below_zero_is_insufficient_stock() {
        let effect = StockEffect::Outbound { quantity: 8 };
        let err = effect.apply(5).unwrap_err();
        match err {
            DomainError::InsufficientStock {
                available,
                requested,
            } => {
                assert_eq!(available, 5);
                assert_eq!(requested, 8);
            }
            _ => panic!("Expected InsufficientStock error"),
        }
    }

    #[test]
    fn outbound_to_exactly_zero_is_allowed() {
        let effect = StockEffect::Outbound { quantity: 5 };
        assert_eq!(effect.apply(5).unwrap(), 0);
    }

    #[test]
    fn inbound_overflow_is_rejected() {
        let effect = StockEffect::Inbound { quantity: 1 };
        assert!(effect.apply(i64::MAX).is_err());
    }

    #[test]
    fn replay_sums_the_deltas() {
        let now = Utc::now();
        let history = vec![
            InventoryMovement::record(&request(MovementType::In, None, 10), 0, 10, now),
            InventoryMovement::record(&request(MovementType::Out, None, 3), 10, 7, now),
            InventoryMovement::record(
                &request(MovementType::Adjustment, Some(ReasonCategory::Correction), 20),
                7,
                20,
                now,
            ),
        ];
        assert_eq!(replay_stock(&history), 20);
        assert_eq!(replay_stock(&[]), 0);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                // Use deterministic seed for CI reproducibility
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: an inbound quantity followed by the same outbound
            /// quantity returns the level to where it started.
            #[test]
            fn inbound_then_outbound_round_trips(
                start in 0i64..1_000_000,
                quantity in 1i64..1_000_000,
            ) {
                let up = StockEffect::Inbound { quantity }.apply(start).unwrap();
                let down = StockEffect::Outbound { quantity }.apply(up).unwrap();
                prop_assert_eq!(down, start);
            }

            /// Property: an accepted outbound never yields a negative level.
            #[test]
            fn accepted_outbound_is_never_negative(
                start in 0i64..1_000_000,
                quantity in 1i64..2_000_000,
            ) {
                match (StockEffect::Outbound { quantity }).apply(start) {
                    Ok(level) => prop_assert!(level >= 0),
                    Err(DomainError::InsufficientStock { available, requested }) => {
                        prop_assert_eq!(available, start);
                        prop_assert_eq!(requested, quantity);
                        prop_assert!(quantity > start);
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
                }
            }

            /// Property: replaying any history of accepted effects lands on
            /// the final stock level (the deltas are the ledger).
            #[test]
            fn replay_matches_final_level(
                steps in proptest::collection::vec((0u8..4, 1i64..500), 0..40),
            ) {
                let now = Utc::now();
                let mut level = 0i64;
                let mut history = Vec::new();

                for (kind, quantity) in steps {
                    let req = match kind {
                        0 => request(MovementType::In, None, quantity),
                        1 => request(MovementType::Out, None, quantity),
                        2 => request(
                            MovementType::Adjustment,
                            Some(ReasonCategory::InventoryCount),
                            quantity,
                        ),
                        _ => request(MovementType::Adjustment, Some(ReasonCategory::Other), quantity),
                    };
                    let effect = req.effect().unwrap();
                    let Ok(next) = effect.apply(level) else {
                        // Rejected moves leave no trace in the ledger.
                        continue;
                    };
                    history.push(InventoryMovement::record(&req, level, next, now));
                    level = next;
                }

                prop_assert_eq!(replay_stock(&history), level);
            }
        }
    }
}
