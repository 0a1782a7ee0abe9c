/// Возвращает `Err(StackError)` из текущей функции.
///
/// `bail!(err)` принимает любую ошибку, приводимую к `StackError`;
/// `bail!(code, "fmt", args..)` строит [`GenericError`] с кодом статуса.
///
/// [`GenericError`]: crate::GenericError
#[macro_export]
macro_rules! bail {
    ($err:expr $(,)?) => {
        return ::core::result::Result::Err($crate::StackError::from($err))
    };
    ($code:expr, $($fmt:tt)+) => {
        return ::core::result::Result::Err($crate::StackError::new(
            $crate::GenericError::new($code, ::std::format!($($fmt)+)),
        ))
    };
}

/// `bail!`, если условие ложно. Аргументы после условия те же, что у
/// `bail!`.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($rest:tt)+) => {
        if !($cond) {
            $crate::bail!($($rest)+);
        }
    };
}

/// Приводит ошибку `Result` к `StackError` и добавляет кадр контекста.
#[macro_export]
macro_rules! context {
    ($result:expr, $($fmt:tt)+) => {
        ($result).map_err(|e| $crate::StackError::from(e).context(::std::format!($($fmt)+)))
    };
}

#[cfg(test)]
mod tests {
    use crate::{CodecError, LineageResult, StatusCode};

    fn check_level(level: i32) -> LineageResult<i32> {
        ensure!(level >= 1, StatusCode::InvalidArgs, "level must be positive");
        ensure!(
            level <= 22,
            StatusCode::InvalidArgs,
            "level {} is out of range",
            level
        );
        Ok(level)
    }

    #[test]
    fn test_ensure_with_code() {
        assert_eq!(check_level(3).unwrap(), 3);

        let err = check_level(0).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidArgs);
        assert_eq!(err.to_string(), "level must be positive");

        let err = check_level(40).unwrap_err();
        assert_eq!(err.to_string(), "level 40 is out of range");
    }

    #[test]
    fn test_bail_with_error_value() {
        fn reject() -> LineageResult<()> {
            bail!(CodecError::validation("tag name is empty"));
        }
        let err = reject().unwrap_err();
        assert!(err.codec().is_some_and(CodecError::is_validation));
    }

    #[test]
    fn test_context_macro() {
        let res: Result<(), CodecError> = Err(CodecError::decode("xml", "unclosed <Person>"));
        let err = context!(res, "reading part {}", 2).unwrap_err();
        assert_eq!(err.frames()[0].message, "reading part 2");
        assert!(err.codec().is_some_and(CodecError::is_decode));
    }
}
