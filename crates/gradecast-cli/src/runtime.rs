// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use gradecast_app::{Prediction, RequestId, SubmitError};
use gradecast_client::Client;
use gradecast_tui::{InternalEvent, PredictRuntime};
use std::sync::mpsc::Sender;
use std::thread;

/// Bridges the terminal UI to the HTTP client.
pub struct ClientRuntime {
    client: Client,
}

impl ClientRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl PredictRuntime for ClientRuntime {
    fn predict(&mut self, fields: &[(String, String)]) -> Result<Prediction, SubmitError> {
        self.client.predict(fields)
    }

    fn spawn_prediction(
        &mut self,
        request_id: RequestId,
        fields: Vec<(String, String)>,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self.client.clone();
        thread::Builder::new()
            .name(format!("predict-{}", request_id.get()))
            .spawn(move || {
                let outcome = client.predict(&fields);
                if tx
                    .send(InternalEvent::SubmissionFinished {
                        request_id,
                        outcome,
                    })
                    .is_err()
                {
                    tracing::debug!(
                        request_id = request_id.get(),
                        "ui exited before prediction finished"
                    );
                }
            })
            .context("spawn prediction thread")?;
        Ok(())
    }
}
