use crate::core::ModuleInstance;

/// Values returned by the listeners of one trigger, in call order.
#[derive(Debug, Default, Clone)]
pub struct ResponseCollection {
    responses: Vec<Option<ModuleInstance>>,
    stopped: bool,
}

impl ResponseCollection {
    pub(crate) fn push(&mut self, response: Option<ModuleInstance>) {
        self.responses.push(response);
    }

    pub(crate) fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    /// Whether dispatch ended before every listener ran
    pub fn stopped(&self) -> bool {
        self.stopped
    }

    /// Value returned by the first listener
    pub fn first(&self) -> Option<&ModuleInstance> {
        self.responses.first().and_then(|r| r.as_ref())
    }

    /// Value returned by the most recent listener
    pub fn last(&self) -> Option<&ModuleInstance> {
        self.responses.last().and_then(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Whether any listener returned this exact instance
    pub fn contains(&self, module: &ModuleInstance) -> bool {
        self.responses
            .iter()
            .flatten()
            .any(|response| response.ptr_eq(module))
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&ModuleInstance>> {
        self.responses.iter().map(|r| r.as_ref())
    }
}
