// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use lazy_static::lazy_static;
use prometheus::core::{AtomicU64, GenericCounter, GenericCounterVec, Opts};

lazy_static! {
    pub static ref ROUNDS_TOTAL: Box<GenericCounter<AtomicU64>> = {
        let rounds_total = Box::new(
            GenericCounter::<AtomicU64>::new(
                "challenge_rounds_total",
                "Total number of judge moves applied across all challenges",
            )
            .expect("Defining the challenge_rounds_total metric must succeed"),
        );
        prometheus::default_registry()
            .register(rounds_total.clone())
            .expect(
                "Registering the challenge_rounds_total metric with the metrics registry must succeed",
            );
        rounds_total
    };
    pub static ref RESOLVED_TOTAL: Box<GenericCounterVec<AtomicU64>> = {
        let resolved_total = Box::new(
            GenericCounterVec::<AtomicU64>::new(
                Opts::new(
                    "challenge_resolved_total",
                    "Total number of challenges resolved, by winner",
                ),
                &[labels::WINNER],
            )
            .expect("Defining the challenge_resolved_total metric must succeed"),
        );
        prometheus::default_registry()
            .register(resolved_total.clone())
            .expect(
                "Registering the challenge_resolved_total metric with the metrics registry must succeed",
            );
        resolved_total
    };
    pub static ref ONE_STEP_PROOFS_TOTAL: Box<GenericCounter<AtomicU64>> = {
        let one_step_proofs_total = Box::new(
            GenericCounter::<AtomicU64>::new(
                "challenge_one_step_proofs_total",
                "Total number of one-step proofs assembled",
            )
            .expect("Defining the challenge_one_step_proofs_total metric must succeed"),
        );
        prometheus::default_registry()
            .register(one_step_proofs_total.clone())
            .expect(
                "Registering the challenge_one_step_proofs_total metric with the metrics registry must succeed",
            );
        one_step_proofs_total
    };
    pub static ref STALE_EVENTS_TOTAL: Box<GenericCounter<AtomicU64>> = {
        let stale_events_total = Box::new(
            GenericCounter::<AtomicU64>::new(
                "challenge_stale_events_total",
                "Total number of judge events dropped as duplicates or out of turn",
            )
            .expect("Defining the challenge_stale_events_total metric must succeed"),
        );
        prometheus::default_registry()
            .register(stale_events_total.clone())
            .expect(
                "Registering the challenge_stale_events_total metric with the metrics registry must succeed",
            );
        stale_events_total
    };
}

pub mod labels {
    pub const WINNER: &str = "winner";
}

pub mod values {
    pub const ASSERTER: &str = "asserter";
    pub const CHALLENGER: &str = "challenger";
}
