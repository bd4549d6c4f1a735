use crate::ast::ForeachStmt;
use crate::config::ComplianceLevel;
use crate::flow::analyze::FlowAnalyzer;
use crate::flow::context::LoopingContext;
use crate::flow::{FlowInfo, NullStatus, merge_branches};
use crate::span::Span;

use super::LoopKind;

impl FlowAnalyzer<'_, '_> {
    /// Flow through a for-each loop. The element is assigned on every
    /// iteration; the loop exits when the collection is exhausted or by a
    /// `break`.
    pub(crate) fn analyze_foreach(
        &mut self,
        node: &mut ForeachStmt,
        span: Span,
        flow: FlowInfo,
    ) -> FlowInfo {
        node.info.reachable = flow.is_reachable();
        node.info.continue_target = true;
        node.info.action_reachable = false;
        let Some(scope) = node.info.scope else {
            return flow;
        };

        let mut flow = flow;
        self.check_npe(&node.collection, &mut flow);
        let flow = self.analyze_local_decl(&mut node.element, flow);
        let mut cond = self.analyze_expr(&node.collection, flow.clone());
        if let Some(element) = node.element.binding {
            cond.mark_as_definitely_assigned(element);
        }
        node.info.post_collection_state = Some(self.ctx.flow_states.record(&cond));

        self.contexts.push_looping(scope, flow.clone());
        let mut action_info = cond.null_info_less_copy();
        let skip_action = match &node.action {
            None => true,
            Some(action) => {
                action.node.is_empty_block()
                    && self.ctx.options.compliance <= ComplianceLevel::Jdk1_3
            }
        };
        let analyzed_action = match &mut node.action {
            Some(action) if !skip_action => {
                if !self.complain_if_unreachable(action.span, &action_info, false) {
                    node.info.action_reachable = true;
                    action_info = self.analyze_stmt(action, action_info);
                }
                true
            }
            _ => false,
        };
        let looping = self.contexts.pop_looping();
        debug_assert!(looping.is_some(), "for-each popped a non-looping flow context");
        let Some(looping) = looping else {
            return flow;
        };

        let exit_branch = if analyzed_action {
            let mut exit = flow.clone();
            exit.add_initializations_from(&cond);
            if action_info.is_unreachable() && looping.inits_on_continue.is_unreachable() {
                node.info.continue_target = false;
                tracing::debug!(
                    span = ?span,
                    "for-each body never continues; continue target elided"
                );
            } else {
                action_info = action_info.merged_with(&looping.inits_on_continue);
                self.complain_on_deferred_finals(&looping, &action_info);
                exit.add_potential_initializations_from(&action_info);
            }
            exit
        } else {
            cond.clone()
        };

        self.mark_synthetics_used(node);
        let back_edge = node.info.continue_target.then_some(&action_info);
        self.complain_on_deferred_nulls(&looping, back_edge);

        let break_side = if looping.inits_on_break.is_unreachable() {
            looping.inits_on_break.clone()
        } else {
            let mut side = flow;
            side.add_initializations_from(&looping.inits_on_break);
            side
        };
        let merged = merge_branches(break_side, false, exit_branch, false, true);
        node.info.merged_state = Some(self.ctx.flow_states.record(&merged));
        tracing::debug!(
            span = ?span,
            continue_target = node.info.continue_target,
            exits = merged.is_reachable(),
            "analyzed for-each loop"
        );
        merged
    }

    /// Synthetic locals are used only when the generated loop touches them.
    fn mark_synthetics_used(&mut self, node: &ForeachStmt) {
        let Some(kind) = node.info.classification.kind() else {
            return;
        };
        match kind {
            LoopKind::Array { index, bound, source } => {
                let element_materialized =
                    node.element.binding.is_some_and(|id| self.ctx.is_materialized(id));
                if !node.has_empty_action() || element_materialized {
                    self.ctx.scope.mark_used(*source);
                    if node.info.continue_target {
                        self.ctx.scope.mark_used(*index);
                        self.ctx.scope.mark_used(*bound);
                    }
                }
            }
            // The iterator is advanced even when the element is unused.
            LoopKind::RawIterable { iterator, .. } | LoopKind::GenericIterable { iterator, .. } => {
                self.ctx.scope.mark_used(*iterator);
            }
        }
    }

    /// A final local assigned in the body may already be assigned by an
    /// earlier iteration.
    fn complain_on_deferred_finals(&mut self, looping: &LoopingContext, end_of_body: &FlowInfo) {
        for (local, span) in &looping.deferred_finals {
            if end_of_body.is_potentially_assigned(*local) {
                let name = self.ctx.local(*local).name.clone();
                self.report_final_reassignment(&name, *span);
            }
        }
    }

    /// Settle dereferences whose nullness depended on the loop: a local is
    /// null on the first iteration as it was upstream, and on later ones as
    /// the back edge leaves it. Still unknown goes to the enclosing loop.
    fn complain_on_deferred_nulls(
        &mut self,
        looping: &LoopingContext,
        back_edge: Option<&FlowInfo>,
    ) {
        for (local, span) in &looping.deferred_nulls {
            let upstream = looping.upstream.null_status(*local);
            let status = match back_edge {
                Some(back) => upstream.join(back.null_status(*local)),
                None => upstream,
            };
            match (upstream, status) {
                (NullStatus::Null, _) => self.report_null(*local, *span),
                (_, NullStatus::Null | NullStatus::PotentiallyNull) => {
                    self.report_potential_null(*local, *span)
                }
                (_, NullStatus::NonNull) => {}
                (_, NullStatus::Unknown) => {
                    let declared_in = self.ctx.local(*local).scope;
                    self.contexts
                        .record_using_null_reference(*local, declared_in, *span, &self.ctx.scope);
                }
            }
        }
    }
}
