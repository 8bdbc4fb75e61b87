//! Closed value sets for status, stage and type fields.

/// Declares a closed enumeration whose wire values are the given literals.
macro_rules! choices {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $value)] $variant),+
        }

        impl $name {
            pub const VALUES: &'static [&'static str] = &[$($value),+];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }

            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($value => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

choices!(ClientStatus {
    Active => "Ativo",
    Inactive => "Inativo",
    Churn => "Churn",
});

choices!(LeadStatus {
    New => "Novo",
    Contacted => "Contatado",
    Qualified => "Qualificado",
});

choices!(DealStage {
    Lead => "Lead",
    Contact => "Contato",
    Proposal => "Proposta",
    Negotiation => "Negociação",
    Won => "Ganho",
    Lost => "Perdido",
});

choices!(ActivityType {
    Prospecting => "Prospecção Novo Lead",
    FollowUp => "Follow Up",
    Call => "Ligação",
    ExternalMeeting => "Reunião externa",
    Visit => "Visita",
    GoogleEvent => "Google Event",
});

choices!(ActivityStatus {
    Pending => "pending",
    Done => "done",
});

choices!(PriceModel {
    Fixed => "fixed",
    Hourly => "hourly",
    Monthly => "monthly",
    Yearly => "yearly",
});

choices!(ProductCategory {
    Course => "Curso",
    Diagnosis => "Diagnóstico",
    Advisory => "Assessoria",
    Hours => "Horas",
    Club => "Club",
});

choices!(StepType {
    Meeting => "meeting",
    Task => "task",
    Milestone => "milestone",
});

choices!(ProjectType {
    Diagnosis => "Diagnóstico",
    Advisory => "Assessoria",
    Recurring => "Recorrência",
    Implementation => "Implementação",
    Club => "Club",
});

choices!(ProjectStatus {
    InProgress => "Em Andamento",
    AwaitingApproval => "Aguardando Aprovação",
    Done => "Concluído",
    DataCollection => "Coleta de Dados",
    Late => "Atrasado",
    Paused => "Pausado",
});

choices!(SlaStatus {
    Ok => "ok",
    Warning => "warning",
    Delay => "delay",
});

choices!(DocType {
    Procedure => "POP",
    Spreadsheet => "Planilha",
    Contract => "Contrato",
    Report => "Relatório",
    Diagnosis => "Diagnóstico",
});

choices!(NoteType {
    Internal => "internal",
    External => "external",
    Risk => "risk",
    Highlight => "highlight",
});

choices!(OnboardingStage {
    PendingKickoff => "Pendente de Kickoff",
    InProgress => "Em andamento",
    Done => "Concluído",
});

choices!(TicketArea {
    Tax => "Fiscal",
    Accounting => "Contábil",
    Payroll => "Pessoal",
    Dominio => "Domínio",
    Finance => "Financeiro",
    It => "TI",
    CustomerSuccess => "Sucesso do Cliente",
});

choices!(TicketPriority {
    Low => "Baixa",
    Medium => "Média",
    High => "Alta",
    Urgent => "Urgente",
});

choices!(
    /// Support ticket lifecycle; every value may follow any other
    TicketStatus {
        Open => "Aberto",
        UnderReview => "Em Análise",
        AnsweredByConsultant => "Respondido Pelo Consultor",
        AnsweredByClient => "Respondido pelo Cliente",
        InProgress => "Em Andamento",
        AwaitingClient => "Aguardando Cliente",
        Resolved => "Resolvido",
        Closed => "Concluído",
    }
);

choices!(InteractionRole {
    Client => "client",
    Support => "support",
    System => "system",
});

choices!(TaskStatus {
    Pending => "pending",
    InProgress => "in_progress",
    Completed => "completed",
    Overdue => "overdue",
});

choices!(AssigneeType {
    Consultant => "consultant",
    Client => "client",
});

choices!(LedgerType {
    Credit => "credit",
    Debit => "debit",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_values() {
        assert_eq!(TicketStatus::parse("Aberto"), Some(TicketStatus::Open));
        assert_eq!(DealStage::parse("Negociação"), Some(DealStage::Negotiation));
        assert_eq!(LedgerType::parse("credit"), Some(LedgerType::Credit));
        assert_eq!(LedgerType::parse("Credit"), None);
    }

    #[test]
    fn values_follow_declaration_order() {
        assert_eq!(TicketStatus::VALUES.len(), 8);
        assert_eq!(TicketStatus::VALUES[0], TicketStatus::Open.as_str());
        assert_eq!(OnboardingStage::PendingKickoff.to_string(), "Pendente de Kickoff");
    }

    #[test]
    fn serializes_as_wire_value() {
        let value = serde_json::to_value(TaskStatus::InProgress).unwrap();
        assert_eq!(value, serde_json::json!("in_progress"));
    }
}
