//! `define_rule!` builds a rule struct, its matcher and a typed picks struct from a pattern.
//!
//! A pattern is `(Type => pick)`, `(Type if predicate => pick)` or either of those with a
//! child list `[child, ...]`. A child is a nested pattern, `_` (any single node) or `..`
//! (any remaining nodes). Without a child list the node may have any children. Picks are
//! numbered in pre-order, so the matcher and the picks struct agree on the slots.

macro_rules! define_matcher {
    ( $pick_num:ident, ( $typ:ident $(if $pred:path)? => $pick:ident $(, [ $($child:tt),* ])? ) ) => {
        optd_core::rules::RuleMatcher::MatchAndPickNode {
            typ: crate::plan_nodes::DistNodeType::$typ,
            predicate: crate::rules::macros::define_matcher!(@pred $($pred)?),
            pick_to: {
                let x = $pick_num;
                $pick_num += 1;
                x
            },
            children: crate::rules::macros::define_matcher!(@children $pick_num $(, [ $($child),* ])?),
        }
    };

    (@pred) => {
        None
    };

    (@pred $pred:path) => {
        Some($pred as optd_core::rules::NodePredicate<crate::plan_nodes::DistPlanNode>)
    };

    (@children $pick_num:ident) => {
        vec![optd_core::rules::RuleMatcher::IgnoreMany]
    };

    (@children $pick_num:ident, [ $($child:tt),* ]) => {
        vec![ $( crate::rules::macros::define_matcher!(@child $pick_num, $child) ),* ]
    };

    (@child $pick_num:ident, _) => {
        optd_core::rules::RuleMatcher::IgnoreOne
    };

    (@child $pick_num:ident, ..) => {
        optd_core::rules::RuleMatcher::IgnoreMany
    };

    (@child $pick_num:ident, $child:tt) => {
        crate::rules::macros::define_matcher!($pick_num, $child)
    };
}

macro_rules! define_picks_struct {
    ( @ $name:ident { } -> ( $($field:ident)* ) ) => {
        pub struct $name {
            $( pub $field: crate::plan_nodes::ArcDistPlanNode, )*
        }

        impl $name {
            #[allow(unused_assignments)]
            fn from_picks(
                mut picks: optd_core::rules::Picks<crate::plan_nodes::DistPlanNode>,
            ) -> anyhow::Result<Self> {
                let mut pick_num = 0;
                Ok(Self {
                    $( $field: {
                        let node = picks.take(pick_num)?;
                        pick_num += 1;
                        node
                    }, )*
                })
            }
        }
    };

    ( @ $name:ident { ( $typ:ident $(if $pred:path)? => $pick:ident, [ $($child:tt),* ] ) $($rest:tt)* } -> ( $($field:ident)* ) ) => {
        crate::rules::macros::define_picks_struct!(@ $name { $($child)* $($rest)* } -> ( $($field)* $pick ));
    };

    ( @ $name:ident { ( $typ:ident $(if $pred:path)? => $pick:ident ) $($rest:tt)* } -> ( $($field:ident)* ) ) => {
        crate::rules::macros::define_picks_struct!(@ $name { $($rest)* } -> ( $($field)* $pick ));
    };

    ( @ $name:ident { _ $($rest:tt)* } -> ( $($field:ident)* ) ) => {
        crate::rules::macros::define_picks_struct!(@ $name { $($rest)* } -> ( $($field)* ));
    };

    ( @ $name:ident { .. $($rest:tt)* } -> ( $($field:ident)* ) ) => {
        crate::rules::macros::define_picks_struct!(@ $name { $($rest)* } -> ( $($field)* ));
    };

    ( $name:ident, $pattern:tt ) => {
        crate::rules::macros::define_picks_struct!(@ $name { $pattern } -> ());
    };
}

macro_rules! define_rule {
    ($name:ident, $apply:ident, $pattern:tt) => {
        pub struct $name {
            matcher: optd_core::rules::RuleMatcher<crate::plan_nodes::DistPlanNode>,
        }

        impl $name {
            pub fn new() -> Self {
                let mut pick_num = 0;
                let matcher = crate::rules::macros::define_matcher!(pick_num, $pattern);
                let _ = pick_num;
                Self { matcher }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        camelpaste::paste! {
            crate::rules::macros::define_picks_struct! { [<$name Picks>], $pattern }
        }

        impl optd_core::rules::Rule<crate::plan_nodes::DistPlanNode, crate::context::PlanningContext>
            for $name
        {
            fn matcher(&self) -> &optd_core::rules::RuleMatcher<crate::plan_nodes::DistPlanNode> {
                &self.matcher
            }

            fn apply(
                &self,
                context: &mut crate::context::PlanningContext,
                picks: optd_core::rules::Picks<crate::plan_nodes::DistPlanNode>,
            ) -> anyhow::Result<Vec<crate::plan_nodes::ArcDistPlanNode>> {
                let picks = camelpaste::paste! { [<$name Picks>]::from_picks(picks)? };
                $apply(context, picks)
            }

            camelpaste::paste! {
                fn name(&self) -> &'static str {
                    stringify!([< $name:snake >])
                }
            }
        }
    };
}

pub(crate) use define_matcher;
pub(crate) use define_picks_struct;
pub(crate) use define_rule;
