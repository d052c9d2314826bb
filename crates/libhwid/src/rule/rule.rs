/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

// src/rule/rule.rs
// A named rule: an optional condition, the expressions evaluated when
// it holds, and the expressions evaluated when it doesn't.

use crate::rule::context::Context;
use crate::rule::error::{RuleEvaluationError, RuleParseError};
use crate::rule::evaluator;
use crate::rule::parser::Expression;
use crate::rule::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub when: Option<Expression>,
    pub evaluate: Vec<Expression>,
    pub otherwise: Vec<Expression>,
}

impl Rule {
    // parse builds a rule from the text of its expressions.
    pub fn parse(
        name: &str,
        when: Option<&str>,
        evaluate: &[String],
        otherwise: &[String],
    ) -> Result<Self, RuleParseError> {
        let parse_all = |sources: &[String]| {
            sources
                .iter()
                .map(|source| Expression::parse(source))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Self {
            name: name.to_string(),
            when: when.map(Expression::parse).transpose()?,
            evaluate: parse_all(evaluate)?,
            otherwise: parse_all(otherwise)?,
        })
    }

    // in_namespace reports whether the rule name matches a namespace
    // pattern. A trailing '*' matches any suffix.
    pub fn in_namespace(&self, namespace: &str) -> bool {
        match namespace.strip_suffix('*') {
            Some(prefix) => self.name.starts_with(prefix),
            None => self.name == namespace,
        }
    }

    fn run(&self, expression: &Expression, context: &mut Context<'_>) -> Result<Value, RuleEvaluationError> {
        evaluator::evaluate(expression, context).map_err(|(span, failure)| RuleEvaluationError {
            rule: self.name.clone(),
            expression: expression.text_of(span).to_string(),
            failure,
        })
    }

    // evaluate runs the rule against a context, stopping at the first
    // failing expression.
    pub fn evaluate(&self, context: &mut Context<'_>) -> Result<(), RuleEvaluationError> {
        let holds = match &self.when {
            Some(when) => self.run(when, context)?.is_truthy(),
            None => true,
        };
        let expressions = if holds { &self.evaluate } else { &self.otherwise };
        tracing::debug!(rule = %self.name, holds, "Evaluating rule");
        for expression in expressions {
            self.run(expression, context)?;
        }
        Ok(())
    }
}

// evaluate_rules runs the database's rules in order against a context
// and returns the updated context. When a namespace is given only
// matching rules run.
pub fn evaluate_rules<'db>(
    mut context: Context<'db>,
    namespace: Option<&str>,
) -> Result<Context<'db>, RuleEvaluationError> {
    let database = context.database();
    let mut evaluated = 0;
    for rule in database.raw_rules() {
        if namespace.is_some_and(|namespace| !rule.in_namespace(namespace)) {
            continue;
        }
        if let Err(error) = rule.evaluate(&mut context) {
            tracing::warn!(rule = %rule.name, error = %error, "Rule evaluation failed");
            return Err(error);
        }
        evaluated += 1;
    }
    tracing::info!(
        project = %database.project(),
        evaluated,
        hwid = %context.identity().encoded_string,
        "Evaluated rules"
    );
    Ok(context)
}
