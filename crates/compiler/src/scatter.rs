// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Scattering assignment (`{a, ?b = 1, @rest, c} = value`) as an ordered series of pops from a
//! working copy of the value.

/// One target of a scattering assignment, in declaration order. `D` is whatever represents a
/// default value: compiled fragments in codegen, plain values in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding<D> {
    Required(String),
    Optional { id: String, default: Option<D> },
    Rest(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPlan<D> {
    front_required: Vec<String>,
    back_required: Vec<String>,
    front_optional: Vec<(String, Option<D>)>,
    back_optional: Vec<(String, Option<D>)>,
    rest: Option<String>,
}

/// A single operation against the working list.
#[derive(Debug, PartialEq)]
pub enum ScatterStep<'a, D> {
    /// `id = w.pop(0)`
    PopFront(&'a str),
    /// `id = w.pop()`
    PopBack(&'a str),
    /// Pop from the front if anything is left, else bind the default (or leave `id` alone).
    PopFrontOr(&'a str, Option<&'a D>),
    PopBackOr(&'a str, Option<&'a D>),
    /// `id = w`
    Rest(&'a str),
}

impl<D> ScatterPlan<D> {
    /// Targets before the splice are taken from the front, targets after it from the back.
    /// Without a splice, required targets following the last optional one are taken from the
    /// back, so that optionals only ever consume surplus values.
    pub fn new(bindings: Vec<Binding<D>>) -> Self {
        let boundary = match bindings.iter().position(|b| matches!(b, Binding::Rest(_))) {
            Some(splice) => splice,
            None => bindings
                .iter()
                .rposition(|b| matches!(b, Binding::Optional { .. }))
                .map(|p| p + 1)
                .unwrap_or(bindings.len()),
        };
        let mut plan = ScatterPlan {
            front_required: vec![],
            back_required: vec![],
            front_optional: vec![],
            back_optional: vec![],
            rest: None,
        };
        for (i, binding) in bindings.into_iter().enumerate() {
            let front = i < boundary;
            match binding {
                Binding::Required(id) if front => plan.front_required.push(id),
                Binding::Required(id) => plan.back_required.push(id),
                Binding::Optional { id, default } if front => {
                    plan.front_optional.push((id, default))
                }
                Binding::Optional { id, default } => plan.back_optional.push((id, default)),
                Binding::Rest(id) => plan.rest = Some(id),
            }
        }
        plan
    }

    pub fn required(&self) -> usize {
        self.front_required.len() + self.back_required.len()
    }

    /// The most values the targets can take, or `None` when a splice absorbs any surplus.
    pub fn maximum(&self) -> Option<usize> {
        match self.rest {
            Some(_) => None,
            None => Some(self.required() + self.front_optional.len() + self.back_optional.len()),
        }
    }

    pub fn steps(&self) -> Vec<ScatterStep<'_, D>> {
        let mut steps = vec![];
        steps.extend(self.front_required.iter().map(|id| ScatterStep::PopFront(id)));
        steps.extend(
            self.back_required
                .iter()
                .rev()
                .map(|id| ScatterStep::PopBack(id)),
        );
        steps.extend(
            self.front_optional
                .iter()
                .map(|(id, default)| ScatterStep::PopFrontOr(id, default.as_ref())),
        );
        steps.extend(
            self.back_optional
                .iter()
                .rev()
                .map(|(id, default)| ScatterStep::PopBackOr(id, default.as_ref())),
        );
        if let Some(rest) = &self.rest {
            steps.push(ScatterStep::Rest(rest));
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use test_case::test_case;
    use transmoo_var::{Var, v_int, v_list_iter};

    /// Runs the steps the way the generated code does, against plain values.
    fn simulate(plan: &ScatterPlan<Var>, values: Vec<Var>, env: &mut HashMap<String, Var>) {
        let mut working: VecDeque<Var> = values.into();
        for step in plan.steps() {
            match step {
                ScatterStep::PopFront(id) => {
                    env.insert(id.to_string(), working.pop_front().unwrap());
                }
                ScatterStep::PopBack(id) => {
                    env.insert(id.to_string(), working.pop_back().unwrap());
                }
                ScatterStep::PopFrontOr(id, default) | ScatterStep::PopBackOr(id, default) => {
                    let popped = if matches!(step, ScatterStep::PopFrontOr(..)) {
                        working.pop_front()
                    } else {
                        working.pop_back()
                    };
                    match (popped, default) {
                        (Some(v), _) => {
                            env.insert(id.to_string(), v);
                        }
                        (None, Some(d)) => {
                            env.insert(id.to_string(), d.clone());
                        }
                        (None, None) => {}
                    }
                }
                ScatterStep::Rest(id) => {
                    env.insert(id.to_string(), v_list_iter(working.drain(..)));
                }
            }
        }
    }

    fn argtest_plan() -> ScatterPlan<Var> {
        ScatterPlan::new(vec![
            Binding::Required("a".into()),
            Binding::Optional {
                id: "b".into(),
                default: None,
            },
            Binding::Optional {
                id: "c".into(),
                default: Some(v_int(8)),
            },
            Binding::Rest("d".into()),
            Binding::Optional {
                id: "e".into(),
                default: Some(v_int(9)),
            },
            Binding::Required("f".into()),
        ])
    }

    fn ints(values: &[i64]) -> Var {
        v_list_iter(values.iter().map(|i| v_int(*i)))
    }

    #[test_case(2, &[1, 17, 8], &[], &[9, 2]; "two")]
    #[test_case(3, &[1, 2, 8], &[], &[9, 3]; "three")]
    #[test_case(4, &[1, 2, 3], &[], &[9, 4]; "four")]
    #[test_case(5, &[1, 2, 3], &[], &[4, 5]; "five")]
    #[test_case(6, &[1, 2, 3], &[4], &[5, 6]; "six")]
    #[test_case(7, &[1, 2, 3], &[4, 5], &[6, 7]; "seven")]
    #[test_case(8, &[1, 2, 3], &[4, 5, 6], &[7, 8]; "eight")]
    fn test_argtest_table(n: i64, abc: &[i64], d: &[i64], ef: &[i64]) {
        let plan = argtest_plan();
        let mut env: HashMap<String, Var> = ["b", "c", "e"]
            .iter()
            .map(|id| (id.to_string(), v_int(17)))
            .collect();
        simulate(&plan, (1..=n).map(v_int).collect(), &mut env);
        let got: Vec<Var> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|id| env[*id].clone())
            .collect();
        let mut expected: Vec<Var> = abc.iter().map(|i| v_int(*i)).collect();
        expected.push(ints(d));
        expected.extend(ef.iter().map(|i| v_int(*i)));
        assert_eq!(got, expected);
    }

    #[test]
    fn test_arity() {
        let plan = argtest_plan();
        assert_eq!(plan.required(), 2);
        assert_eq!(plan.maximum(), None);

        let plan: ScatterPlan<Var> = ScatterPlan::new(vec![
            Binding::Required("a".into()),
            Binding::Optional {
                id: "b".into(),
                default: None,
            },
        ]);
        assert_eq!(plan.required(), 1);
        assert_eq!(plan.maximum(), Some(2));
    }

    #[test]
    fn test_required_after_optional_without_splice() {
        let plan: ScatterPlan<Var> = ScatterPlan::new(vec![
            Binding::Required("a".into()),
            Binding::Optional {
                id: "b".into(),
                default: Some(v_int(0)),
            },
            Binding::Required("c".into()),
        ]);
        let mut env = HashMap::new();
        simulate(&plan, vec![v_int(1), v_int(2)], &mut env);
        assert_eq!(
            (env["a"].clone(), env["b"].clone(), env["c"].clone()),
            (v_int(1), v_int(0), v_int(2))
        );
        simulate(&plan, vec![v_int(1), v_int(2), v_int(3)], &mut env);
        assert_eq!(
            (env["a"].clone(), env["b"].clone(), env["c"].clone()),
            (v_int(1), v_int(2), v_int(3))
        );
    }

    #[test]
    fn test_step_order() {
        let plan = argtest_plan();
        let steps = plan.steps();
        assert_eq!(steps[0], ScatterStep::PopFront("a"));
        assert_eq!(steps[1], ScatterStep::PopBack("f"));
        assert!(matches!(steps[2], ScatterStep::PopFrontOr("b", None)));
        assert!(matches!(steps[4], ScatterStep::PopBackOr("e", Some(_))));
        assert_eq!(steps[5], ScatterStep::Rest("d"));
    }
}
