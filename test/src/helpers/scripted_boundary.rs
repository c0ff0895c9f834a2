use std::collections::{HashMap, VecDeque};

use troupe_peer::{FieldCodec, ScriptBoundary, ScriptError, TickRequest, TickResponse};

/// Script logic supplied by a test
pub type TickHandler =
    Box<dyn FnMut(&TickRequest, &mut FieldCodec<'_>) -> Result<TickResponse, ScriptError>>;

/// Stand-in for the script runtime. Answers ticks from a handler or from a
/// queue of canned responses, and serves memory from a map.
#[derive(Default)]
pub struct ScriptedBoundary {
    handler: Option<TickHandler>,
    responses: VecDeque<Result<TickResponse, ScriptError>>,
    memory: HashMap<String, String>,
    requests: Vec<TickRequest>,
    memory_reads: usize,
}

impl ScriptedBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `handler` for every tick that has no canned response queued
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: FnMut(&TickRequest, &mut FieldCodec<'_>) -> Result<TickResponse, ScriptError> + 'static,
    {
        let mut boundary = Self::new();
        boundary.set_handler(handler);
        boundary
    }

    pub fn set_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&TickRequest, &mut FieldCodec<'_>) -> Result<TickResponse, ScriptError> + 'static,
    {
        self.handler = Some(Box::new(handler));
    }

    pub fn push_response(&mut self, response: TickResponse) {
        self.responses.push_back(Ok(response));
    }

    /// Makes the next tick fail with a runtime error
    pub fn fail_next(&mut self, reason: &str) {
        self.responses.push_back(Err(ScriptError::RuntimeFailed {
            reason: reason.to_string(),
        }));
    }

    pub fn set_memory(&mut self, actor: &str, memory_json: &str) {
        self.memory
            .insert(actor.to_string(), memory_json.to_string());
    }

    /// Every request seen so far, oldest first
    pub fn requests(&self) -> &[TickRequest] {
        &self.requests
    }

    pub fn last_request(&self) -> Option<&TickRequest> {
        self.requests.last()
    }

    pub fn memory_reads(&self) -> usize {
        self.memory_reads
    }
}

impl ScriptBoundary for ScriptedBoundary {
    fn tick(
        &mut self,
        request: &TickRequest,
        fields: &mut FieldCodec<'_>,
    ) -> Result<TickResponse, ScriptError> {
        self.requests.push(request.clone());
        if let Some(response) = self.responses.pop_front() {
            return response;
        }
        match self.handler.as_mut() {
            Some(handler) => handler(request, fields),
            None => Ok(TickResponse::default()),
        }
    }

    fn read_memory(&mut self, actor: &str) -> Option<String> {
        self.memory_reads += 1;
        self.memory.get(actor).cloned()
    }
}
