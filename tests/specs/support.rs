// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the broker specs.

use specforge_adapters::FakeNotifySink;
use specforge_broker::Broker;
use specforge_core::{
    BrokerConfig, FakeClock, OperationIntent, OperationPayload, SeqIdGen,
};
use std::sync::Arc;
use tempfile::TempDir;

pub struct World {
    pub dir: TempDir,
    pub clock: FakeClock,
    pub broker: Broker<FakeNotifySink, FakeClock>,
}

pub fn world() -> World {
    world_with_config(BrokerConfig::default())
}

pub fn world_with_config(config: BrokerConfig) -> World {
    let dir = tempfile::tempdir().expect("tempdir");
    let clock = FakeClock::new();
    let broker = Broker::initialize_with_idgen(
        dir.path(),
        config,
        FakeNotifySink::new(),
        None,
        clock.clone(),
        Arc::new(SeqIdGen::default()),
    );
    World { dir, clock, broker }
}

pub fn create_spec(name: &str) -> OperationIntent {
    OperationIntent::new(OperationPayload::CreateSpec {
        name: name.to_string(),
        description: String::new(),
        spec_id: None,
    })
}

pub fn update_requirements(spec_id: &str, content: &str) -> OperationIntent {
    OperationIntent::new(OperationPayload::UpdateRequirements {
        spec_id: spec_id.to_string(),
        content: content.to_string(),
    })
}

impl World {
    pub fn read_json(&self, relative: &str) -> serde_json::Value {
        let body = std::fs::read_to_string(self.dir.path().join(relative)).expect(relative);
        serde_json::from_str(&body).expect("valid JSON")
    }
}
