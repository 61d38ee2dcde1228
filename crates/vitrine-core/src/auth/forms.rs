//! Account forms submitted through the session manager.

use serde::Serialize;

use crate::validation::{self, ValidationError};

/// Sign-up form, submitted as multipart fields.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub nome: String,
    pub email: String,
    pub cpf: Option<String>,
    pub telefone: Option<String>,
    pub cep: Option<String>,
    pub logradouro: Option<String>,
    pub numero: Option<String>,
    pub complemento: Option<String>,
    pub bairro: Option<String>,
    pub cidade: Option<String>,
    pub estado: Option<String>,
    pub password: String,
    pub password_confirmation: String,
    pub accepted_terms: bool,
}

impl Registration {
    /// Local checks in the order the sign-up form reports them
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.nome.trim().is_empty() || self.email.trim().is_empty() || self.password.is_empty() {
            return Err(ValidationError::MissingFields);
        }
        validation::validate_new_password(&self.password, &self.password_confirmation)?;
        if !self.accepted_terms {
            return Err(ValidationError::TermsNotAccepted);
        }
        validation::validate_name(&self.nome)?;
        validation::validate_email(&self.email)?;
        if let Some(cpf) = non_empty(&self.cpf) {
            validation::validate_cpf(cpf)?;
        }
        if let Some(phone) = non_empty(&self.telefone) {
            validation::validate_phone(phone)?;
        }
        Ok(())
    }

    /// Multipart fields; empty optional fields are left out
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("nome".to_string(), self.nome.trim().to_string()),
            ("email".to_string(), self.email.trim().to_lowercase()),
        ];
        let optional = [
            ("cpf", &self.cpf),
            ("telefone", &self.telefone),
            ("cep", &self.cep),
            ("logradouro", &self.logradouro),
            ("numero", &self.numero),
            ("complemento", &self.complemento),
            ("bairro", &self.bairro),
            ("cidade", &self.cidade),
            ("estado", &self.estado),
        ];
        for (name, value) in optional {
            if let Some(value) = non_empty(value) {
                fields.push((name.to_string(), value.to_string()));
            }
        }
        fields.push(("password".to_string(), self.password.clone()));
        fields.push((
            "password_confirmacao".to_string(),
            self.password_confirmation.clone(),
        ));
        fields
    }
}

/// Body of the confirm-reset-password call.
#[derive(Debug, Clone, Serialize)]
pub struct PasswordReset {
    pub uid: String,
    pub token: String,
    pub nova_senha: String,
    pub nova_senha_confirmacao: String,
}

impl PasswordReset {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_new_password(&self.nova_senha, &self.nova_senha_confirmacao)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
