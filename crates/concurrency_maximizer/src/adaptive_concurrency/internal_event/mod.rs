//! Metrics and log events emitted by the maximizer.
//!
//! Events are registered once, which resolves their `metrics` handles, and the
//! returned handle is emitted many times on the hot path.

mod concurrency_maximizer;

pub use concurrency_maximizer::{
    ConcurrencyDecision, ConcurrencyDecisionData, ConcurrencyDecisionHandle, ObservedDuration,
    ObservedDurationHandle, SampleDiscarded, SampleDiscardedHandle,
};

pub trait RegisterInternalEvent: Sized {
    type Handle: InternalEventHandle;

    fn register(self) -> Self::Handle;
}

pub trait InternalEventHandle: Sized {
    type Data: Sized;
    fn emit(&self, data: Self::Data);
}

pub fn register<E: RegisterInternalEvent>(event: E) -> E::Handle {
    event.register()
}

/// Declares a registered event: the event struct, its handle holding the
/// `metrics` instruments, and the `emit` body run for each data point.
///
/// ```ignore
/// registered_event! {
///     Event => {
///         handle_field: Counter = counter!("name"),
///     }
///
///     fn emit(&self, data: u64) {
///         self.handle_field.increment(data);
///     }
/// }
/// ```
#[macro_export]
macro_rules! registered_event {
    ($event:ident => $($tail:tt)*) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $event;

        $crate::registered_event!(=> $event $($tail)*);
    };

    (
        => $event:ident {
            $( $field:ident: $type:ty = $value:expr, )*
        }

        fn emit(&$slf:ident, $data_name:ident: $data:ty)
            $emit_body:block
    ) => {
        paste::paste!{
            #[derive(Clone)]
            pub struct [<$event Handle>] {
                $( $field: $type, )*
            }

            impl $crate::adaptive_concurrency::internal_event::RegisterInternalEvent for $event {
                type Handle = [<$event Handle>];

                fn register($slf) -> Self::Handle {
                    Self::Handle {
                        $( $field: $value, )*
                    }
                }
            }

            impl $crate::adaptive_concurrency::internal_event::InternalEventHandle for [<$event Handle>] {
                type Data = $data;

                fn emit(&$slf, $data_name: $data)
                    $emit_body
            }
        }
    };
}
