// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use lazy_static::lazy_static;
use prometheus::core::{AtomicU64, GenericCounter};

lazy_static! {
    pub static ref EVENTS_DELIVERED_TOTAL: Box<GenericCounter<AtomicU64>> = {
        let events_delivered_total = Box::new(
            GenericCounter::<AtomicU64>::new(
                "reactor_events_delivered_total",
                "Total number of judge events delivered to challenge drivers",
            )
            .expect("Defining the reactor_events_delivered_total metric must succeed"),
        );
        prometheus::default_registry()
            .register(events_delivered_total.clone())
            .expect(
                "Registering the reactor_events_delivered_total metric with the metrics registry must succeed",
            );
        events_delivered_total
    };
    pub static ref DUPLICATE_EVENTS_TOTAL: Box<GenericCounter<AtomicU64>> = {
        let duplicate_events_total = Box::new(
            GenericCounter::<AtomicU64>::new(
                "reactor_duplicate_events_total",
                "Total number of redelivered events dropped by the dedup cache",
            )
            .expect("Defining the reactor_duplicate_events_total metric must succeed"),
        );
        prometheus::default_registry()
            .register(duplicate_events_total.clone())
            .expect(
                "Registering the reactor_duplicate_events_total metric with the metrics registry must succeed",
            );
        duplicate_events_total
    };
    pub static ref REORG_TOTAL: Box<GenericCounter<AtomicU64>> = {
        let reorg_total = Box::new(
            GenericCounter::<AtomicU64>::new(
                "reactor_reorg_total",
                "Total number of chain reorganizations the reactor rewound through",
            )
            .expect("Defining the reactor_reorg_total metric must succeed"),
        );
        prometheus::default_registry()
            .register(reorg_total.clone())
            .expect("Registering the reactor_reorg_total metric with the metrics registry must succeed");
        reorg_total
    };
    pub static ref QUEUE_OVERFLOW_TOTAL: Box<GenericCounter<AtomicU64>> = {
        let queue_overflow_total = Box::new(
            GenericCounter::<AtomicU64>::new(
                "reactor_queue_overflow_total",
                "Total number of times the bounded event queue overflowed",
            )
            .expect("Defining the reactor_queue_overflow_total metric must succeed"),
        );
        prometheus::default_registry()
            .register(queue_overflow_total.clone())
            .expect(
                "Registering the reactor_queue_overflow_total metric with the metrics registry must succeed",
            );
        queue_overflow_total
    };
    pub static ref RESUBSCRIBE_TOTAL: Box<GenericCounter<AtomicU64>> = {
        let resubscribe_total = Box::new(
            GenericCounter::<AtomicU64>::new(
                "reactor_resubscribe_total",
                "Total number of subscription teardowns followed by replay",
            )
            .expect("Defining the reactor_resubscribe_total metric must succeed"),
        );
        prometheus::default_registry()
            .register(resubscribe_total.clone())
            .expect(
                "Registering the reactor_resubscribe_total metric with the metrics registry must succeed",
            );
        resubscribe_total
    };
}
