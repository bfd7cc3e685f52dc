use anyhow::Error;
use noticeboard::prelude::NoticeError;

/// Process exit code: 2 when the user needs to (re)authenticate, otherwise 1.
pub fn exit_code(err: &Error) -> i32 {
    if matches!(
        err.downcast_ref::<NoticeError>(),
        Some(NoticeError::Unauthorized | NoticeError::Auth { .. } | NoticeError::KeyStore { .. })
    ) {
        return 2;
    }
    1
}
