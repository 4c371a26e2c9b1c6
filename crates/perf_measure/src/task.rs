//! Measured task plumbing: return values and display names.

use std::convert::Infallible;

/// Return value of a measured callable.
///
/// The value itself is discarded after timing; only an error survives, and
/// it propagates to whoever asked for the measurement.
pub trait TaskOutput {
    /// Error the callable can fail with.
    type Error;

    /// Discard the value, keeping a failure.
    fn into_outcome(self) -> Result<(), Self::Error>;
}

impl<T, E> TaskOutput for Result<T, E> {
    type Error = E;

    fn into_outcome(self) -> Result<(), E> {
        self.map(|_| ())
    }
}

macro_rules! infallible_output {
    ($($ty:ty),* $(,)?) => {
        $(
            impl TaskOutput for $ty {
                type Error = Infallible;

                #[inline]
                fn into_outcome(self) -> Result<(), Infallible> {
                    Ok(())
                }
            }
        )*
    };
}

infallible_output!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    String,
);

impl<T> TaskOutput for Vec<T> {
    type Error = Infallible;

    #[inline]
    fn into_outcome(self) -> Result<(), Infallible> {
        Ok(())
    }
}

impl<T> TaskOutput for Option<T> {
    type Error = Infallible;

    #[inline]
    fn into_outcome(self) -> Result<(), Infallible> {
        Ok(())
    }
}

/// Display name of a callable type.
///
/// Named functions and methods yield their identifier; closures and other
/// anonymous callables yield an empty string.
pub fn callable_name<F: ?Sized>() -> String {
    display_name(std::any::type_name::<F>())
}

fn display_name(type_name: &str) -> String {
    // Drop generic arguments so `app::parse::<u8>` reads as `app::parse`.
    let mut path = String::with_capacity(type_name.len());
    let mut depth = 0usize;
    for c in type_name.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth == 0 => path.push(c),
            _ => {}
        }
    }

    let path = path.trim_end_matches("::");
    let last = path.rsplit("::").next().unwrap_or(path);

    let is_identifier = !last.is_empty()
        && !last.starts_with(|c: char| c.is_ascii_digit())
        && last.chars().all(|c| c.is_alphanumeric() || c == '_');

    if is_identifier {
        last.to_string()
    } else {
        String::new()
    }
}
