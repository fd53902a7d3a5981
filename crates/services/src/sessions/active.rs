use gradeup_core::model::{ResultId, TestSession};

/// A test being taken, plus the id of its stored result once persisted.
///
/// The stored id is what keeps submit, expiry and the timer tick from
/// writing the same result twice.
#[derive(Debug)]
pub struct ActiveTest {
    session: TestSession,
    result_id: Option<ResultId>,
}

impl ActiveTest {
    pub(crate) fn new(session: TestSession) -> Self {
        Self {
            session,
            result_id: None,
        }
    }

    #[must_use]
    pub fn session(&self) -> &TestSession {
        &self.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut TestSession {
        &mut self.session
    }

    #[must_use]
    pub fn result_id(&self) -> Option<ResultId> {
        self.result_id
    }

    pub(crate) fn set_result_id(&mut self, id: ResultId) {
        self.result_id = Some(id);
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.session.is_completed()
    }

    /// Completed and stored.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.result_id.is_some()
    }
}
