//! The `status_machine!` declaration macro.

/// Declares a closed status enumeration and implements
/// [`StatusValue`](crate::status::StatusValue) for it.
///
/// # Syntax
///
/// ```text
/// status_machine! {
///     pub enum Name: "kind" {
///         unknown: Sentinel = code,
///         Member = code, "Display" => [Target, ...],
///         ...
///     }
/// }
/// ```
///
/// The sentinel has no successors and is excluded from lookups. Successor
/// lists become `'static` slices; no member is its own successor unless
/// listed.
#[macro_export]
macro_rules! status_machine {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $kind:literal {
            unknown: $unknown:ident = $unknown_code:literal,
            $(
                $(#[$member_meta:meta])*
                $member:ident = $code:literal, $display:literal => [$($target:ident),* $(,)?]
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            /// A value not known to this build.
            $unknown,
            $(
                $(#[$member_meta])*
                $member,
            )+
        }

        impl $crate::status::StatusValue for $name {
            const KIND: &'static str = $kind;
            const UNKNOWN: Self = Self::$unknown;
            const ALL: &'static [Self] = &[$(Self::$member),+];

            fn code(self) -> i32 {
                match self {
                    Self::$unknown => $unknown_code,
                    $(Self::$member => $code,)+
                }
            }

            fn name(self) -> &'static str {
                match self {
                    Self::$unknown => stringify!($unknown),
                    $(Self::$member => $display,)+
                }
            }

            fn successors(self) -> &'static [Self] {
                match self {
                    Self::$unknown => &[],
                    $(Self::$member => &[$(Self::$target),*],)+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, formatter: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                formatter.write_str($crate::status::StatusValue::name(*self))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::status::StatusValue;
    use rstest::rstest;

    status_machine! {
        enum Light: "light" {
            unknown: Unknown = -1,
            Red = 0, "Red" => [Green],
            Green = 1, "Green" => [Amber],
            Amber = 2, "Amber" => [Red],
            Blinking = 3, "Blinking" => [Blinking, Red],
        }
    }

    #[rstest]
    fn test_generated_tables() {
        assert_eq!(Light::ALL, &[Light::Red, Light::Green, Light::Amber, Light::Blinking]);
        assert_eq!(Light::Amber.code(), 2);
        assert_eq!(Light::Unknown.code(), -1);
        assert_eq!(Light::Green.to_string(), "Green");
    }

    #[rstest]
    #[case(Light::Red, Light::Green, true)]
    #[case(Light::Red, Light::Red, false)]
    #[case(Light::Green, Light::Red, false)]
    #[case(Light::Blinking, Light::Blinking, true)]
    #[case(Light::Unknown, Light::Red, false)]
    fn test_transition_guard(#[case] from: Light, #[case] to: Light, #[case] legal: bool) {
        let result = from.can_transition_to(to);
        assert_eq!(result.is_ok(), legal);
        if let Err(error) = result {
            assert_eq!(error.kind(), ErrorKind::InvalidOperation);
        }
    }

    #[rstest]
    fn test_lookups_exclude_sentinel() {
        assert!(Light::from_name("Unknown").is_err());
        assert!(Light::from_code(-1).is_err());
        assert_eq!(Light::from_name(" amber "), Ok(Light::Amber));
        assert_eq!(Light::from_code_unsafe(42), Light::Unknown);
        assert!(Light::from_code_unsafe(42).is_unknown());
    }
}
