use crate::{
    error::ScriptError,
    field_codec::FieldCodec,
    script::tick_io::{TickRequest, TickResponse},
};

/// The embedded scripting runtime, seen as one opaque call per tick
pub trait ScriptBoundary {
    /// Runs every actor's behavior once. Field reads and writes go through
    /// `fields`; writes are applied only if this call succeeds.
    fn tick(
        &mut self,
        request: &TickRequest,
        fields: &mut FieldCodec<'_>,
    ) -> Result<TickResponse, ScriptError>;

    /// Serializes the current memory of the named actor as JSON, or `None`
    /// when the runtime holds no memory for it
    fn read_memory(&mut self, actor: &str) -> Option<String>;
}
